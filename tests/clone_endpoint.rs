use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::Engine as _;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use site_cloner::services::generator::{VisionModel, VisionPrompt};
use site_cloner::services::pipeline::Cloner;
use site_cloner::services::renderer::{RenderError, Renderer};
use site_cloner::services::storage::ScreenshotStore;
use site_cloner::state::AppState;
use site_cloner::web::router::build_router;

/// "Screenshots" are the url's bytes so the model can tell whose image it got.
#[derive(Default)]
struct FakeRenderer {
    captures: AtomicUsize,
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn capture(&self, url: &str) -> Result<Vec<u8>, RenderError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        if url.contains("never-responds") {
            return Err(RenderError::Timeout { url: url.to_string(), ms: 10_000 });
        }
        // Stagger so concurrent requests overlap on disk.
        let delay = if url.contains("slow") { 60 } else { 5 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(format!("PNG:{url}").into_bytes())
    }

    async fn shutdown(&self) {}
}

/// Echoes the decoded screenshot inside a fenced HTML document.
#[derive(Default)]
struct EchoModel {
    prompts: Mutex<Vec<VisionPrompt>>,
    fail: bool,
}

#[async_trait]
impl VisionModel for EchoModel {
    async fn complete(&self, prompt: &VisionPrompt) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        if self.fail {
            anyhow::bail!("messages api returned 401 Unauthorized: authentication_error: invalid x-api-key");
        }
        let png = base64::engine::general_purpose::STANDARD.decode(&prompt.image_png_base64)?;
        let seen = String::from_utf8(png)?;
        Ok(format!("```html\n<!DOCTYPE html>\n<html><body><p>{seen}</p></body></html>\n```\n"))
    }
}

struct Harness {
    app: Router,
    renderer: Arc<FakeRenderer>,
    model: Arc<EchoModel>,
    _dir: tempfile::TempDir,
    dir: std::path::PathBuf,
}

fn harness(model: EchoModel, strict_status: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let renderer = Arc::new(FakeRenderer::default());
    let model = Arc::new(model);
    let cloner = Cloner::new(renderer.clone(), model.clone(), None, ScreenshotStore::new(dir.path()));
    let state = AppState { cloner: Arc::new(cloner), strict_status };
    let app = build_router(state, "http://localhost:3000").unwrap();
    Harness { app, renderer, model, dir: dir.path().to_path_buf(), _dir: dir }
}

fn post_clone(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/clone")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

#[tokio::test]
async fn root_says_hello() {
    let h = harness(EchoModel::default(), false);
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = send(&h.app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Hello World" }));
}

#[tokio::test]
async fn clone_returns_unfenced_html() {
    let h = harness(EchoModel::default(), false);
    let (status, body) = send(&h.app, post_clone(json!({ "url": "https://example.com" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let html = body["html"].as_str().unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.ends_with("</html>"));
    assert!(!html.contains("```"));
    assert!(html.contains("PNG:https://example.com"));
    assert!(body.get("error").is_none());
    assert!(body.get("detail").is_none());

    let prompts = h.model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].text.contains("(URL: https://example.com)"));
    assert!(!prompts[0].text.contains("Top CSS classes"));
}

#[tokio::test]
async fn missing_or_blank_url_is_rejected_without_side_effects() {
    let h = harness(EchoModel::default(), false);
    for body in [json!({}), json!({ "url": "" }), json!({ "url": "   " }), json!({ "url": null })] {
        let (status, resp) = send(&h.app, post_clone(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["error"], "URL is required");
        assert_eq!(resp["success"], false);
    }
    assert_eq!(h.renderer.captures.load(Ordering::SeqCst), 0);
    assert!(h.model.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn navigation_timeout_degrades_to_error_page() {
    let h = harness(EchoModel::default(), false);
    let (status, body) = send(&h.app, post_clone(json!({ "url": "http://never-responds.test/" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    let html = body["html"].as_str().unwrap();
    assert!(html.contains("Error generating webpage"));
    assert!(html.contains("navigation to http://never-responds.test/ timed out after 10000ms"));
    assert_eq!(body["detail"], "navigation to http://never-responds.test/ timed out after 10000ms");
    // a present `error` makes clients drop the renderable page
    assert!(body.get("error").is_none());
    // render failures stop the pipeline before the model is called
    assert!(h.model.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn model_failure_degrades_and_cleans_up_the_screenshot() {
    let h = harness(EchoModel { fail: true, ..Default::default() }, false);
    let (status, body) = send(&h.app, post_clone(json!({ "url": "https://example.com" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["detail"].as_str().unwrap().contains("401 Unauthorized"));
    assert!(body.get("error").is_none());
    assert!(body["html"].as_str().unwrap().contains("invalid x-api-key"));
    assert!(dir_is_empty(&h.dir));
}

#[tokio::test]
async fn screenshot_files_do_not_outlive_the_request() {
    let h = harness(EchoModel::default(), false);
    for i in 0..3 {
        let (_, body) = send(&h.app, post_clone(json!({ "url": format!("https://site{i}.test") }))).await;
        assert_eq!(body["success"], true);
    }
    assert!(dir_is_empty(&h.dir));
}

#[tokio::test]
async fn concurrent_clones_only_see_their_own_screenshot() {
    let h = harness(EchoModel::default(), false);
    let urls = ["https://slow-a.test", "https://b.test", "https://slow-c.test", "https://d.test"];
    let responses = futures_util::future::join_all(
        urls.iter().map(|url| send(&h.app, post_clone(json!({ "url": url })))),
    )
    .await;

    for (url, (_, body)) in urls.iter().zip(responses) {
        let html = body["html"].as_str().unwrap();
        assert!(html.contains(&format!("PNG:{url}<")), "{url} got {html}");
        for other in urls.iter().filter(|o| *o != url) {
            assert!(!html.contains(&format!("PNG:{other}<")));
        }
    }
    assert_eq!(h.renderer.captures.load(Ordering::SeqCst), urls.len());
}

#[tokio::test]
async fn malformed_body_reports_an_error() {
    let h = harness(EchoModel::default(), false);
    let req = Request::builder()
        .method("POST")
        .uri("/clone")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&h.app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn strict_mode_maps_failures_to_status_codes() {
    let h = harness(EchoModel::default(), true);

    let (status, body) = send(&h.app, post_clone(json!({ "url": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "URL is required");

    let (status, body) = send(&h.app, post_clone(json!({ "url": "http://never-responds.test/" }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert!(body["detail"].is_string());

    let (status, _) = send(&h.app, post_clone(json!({ "url": "https://example.com" }))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn cors_allows_the_dev_origin_only() {
    let h = harness(EchoModel::default(), false);
    let preflight = |origin: &str| {
        Request::builder()
            .method("OPTIONS")
            .uri("/clone")
            .header("origin", origin)
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .body(Body::empty())
            .unwrap()
    };

    let resp = h.app.clone().oneshot(preflight("http://localhost:3000")).await.unwrap();
    let headers = resp.headers();
    assert_eq!(headers["access-control-allow-origin"], "http://localhost:3000");
    assert_eq!(headers["access-control-allow-credentials"], "true");
    assert_eq!(headers["access-control-allow-methods"], "POST");

    let resp = h.app.clone().oneshot(preflight("http://evil.test")).await.unwrap();
    assert!(resp.headers().get("access-control-allow-origin").is_none());

    let simple = Request::builder()
        .uri("/")
        .header("origin", "http://evil.test")
        .body(Body::empty())
        .unwrap();
    let resp = h.app.clone().oneshot(simple).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get("access-control-allow-origin").is_none());
}

