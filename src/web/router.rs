use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{clone_site, root};
use crate::state::AppState;

pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    Ok(Router::new()
        .route("/", get(root))
        .route("/clone", post(clone_site))
        .layer(cors(cors_origin)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// One trusted origin with credentials. Other origins get no
/// `access-control-allow-origin` at all. Methods and headers are mirrored
/// because credentialed CORS cannot use wildcards.
fn cors(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin: HeaderValue = origin
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid CORS origin {origin:?}: {e}"))?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}
