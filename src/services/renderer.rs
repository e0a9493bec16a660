use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, EventDomContentEventFired};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::clone::{VIEWPORT_HEIGHT, VIEWPORT_WIDTH};
use crate::services::browser::SharedBrowser;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("page error: {0}")]
    Page(String),
    #[error("navigation to {url} timed out after {ms}ms")]
    Timeout { url: String, ms: u128 },
    #[error("screenshot failed: {0}")]
    Screenshot(String),
}

/// Turns a url into a PNG of its first viewport.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn capture(&self, url: &str) -> Result<Vec<u8>, RenderError>;

    /// Releases the browser. Safe to call more than once.
    async fn shutdown(&self);
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub nav_timeout: Duration,
    /// Pause after navigation so late scripts and fonts can paint.
    pub settle: Duration,
    pub chrome_path: Option<String>,
}

impl RenderSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
            nav_timeout: cfg.nav_timeout(),
            settle: cfg.settle(),
            chrome_path: cfg.chrome_path.clone(),
        }
    }
}

struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

pub struct ChromeRenderer {
    settings: RenderSettings,
    session: SharedBrowser<ChromeSession>,
}

impl ChromeRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings, session: SharedBrowser::new() }
    }

    async fn launch(&self) -> Result<ChromeSession, RenderError> {
        info!("launching headless chrome");
        let mut builder = BrowserConfig::builder()
            .window_size(self.settings.width, self.settings.height)
            // outlives the navigation bound, so expiry surfaces as `Timeout`
            .request_timeout(self.settings.nav_timeout + Duration::from_secs(30))
            .no_sandbox()
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-default-apps");
        if let Some(path) = &self.settings.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(RenderError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser handler event failed");
                }
            }
        });
        info!("headless chrome ready");
        Ok(ChromeSession { browser, handler })
    }

    /// Resolves at `DOMContentLoaded`. `goto` alone waits for `load`, which
    /// stalled images or fonts can hold past the timeout, so the two race and
    /// the earlier one wins.
    async fn navigate(&self, page: &Page, url: &str) -> Result<(), RenderError> {
        let mut dom_ready = page
            .event_listener::<EventDomContentEventFired>()
            .await
            .map_err(|e| RenderError::Page(e.to_string()))?;

        let ready = async {
            tokio::select! {
                fired = dom_ready.next() => match fired {
                    Some(_) => Ok(()),
                    None => Err(RenderError::Page("page closed before DOMContentLoaded".into())),
                },
                navigated = page.goto(url) => navigated
                    .map(|_| ())
                    .map_err(|e| RenderError::Page(e.to_string())),
            }
        };

        match tokio::time::timeout(self.settings.nav_timeout, ready).await {
            Ok(result) => result,
            Err(_) => Err(RenderError::Timeout { url: url.to_string(), ms: self.settings.nav_timeout.as_millis() }),
        }
    }

    async fn shoot(&self, page: &Page, url: &str) -> Result<Vec<u8>, RenderError> {
        let metrics = SetDeviceMetricsOverrideParams::new(
            i64::from(self.settings.width),
            i64::from(self.settings.height),
            1.0,
            false,
        );
        page.execute(metrics).await.map_err(|e| RenderError::Page(e.to_string()))?;

        self.navigate(page, url).await?;

        if !self.settings.settle.is_zero() {
            tokio::time::sleep(self.settings.settle).await;
        }

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(false)
            .build();
        page.screenshot(params).await.map_err(|e| RenderError::Screenshot(e.to_string()))
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn capture(&self, url: &str) -> Result<Vec<u8>, RenderError> {
        let session = self.session.get_or_launch(|| self.launch()).await?;
        let page = session
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Page(e.to_string()))?;

        let shot = self.shoot(&page, url).await;
        if let Err(e) = page.close().await {
            warn!(%url, error = %e, "failed to close page");
        }
        if let Ok(png) = &shot {
            debug!(%url, bytes = png.len(), "screenshot captured");
        }
        shot
    }

    async fn shutdown(&self) {
        let Some(session) = self.session.take().await else { return };
        match Arc::try_unwrap(session) {
            Ok(mut session) => {
                if let Err(e) = session.browser.close().await {
                    warn!(error = %e, "failed to close browser");
                }
                let _ = session.browser.wait().await;
                let _ = session.handler.await;
                info!("headless chrome closed");
            }
            Err(_) => warn!("browser still referenced at shutdown; it will be killed on drop"),
        }
    }
}
