pub mod clients { pub mod anthropic; }
pub mod config;
pub mod telemetry;
pub mod state;
pub mod error;
pub mod domain { pub mod clone; }
pub mod services { pub mod browser; pub mod classes; pub mod generator; pub mod housekeeping; pub mod pipeline; pub mod renderer; pub mod storage; }
pub mod web { pub mod router; pub mod handlers; pub mod utils; }

use std::sync::Arc;

use crate::clients::anthropic::AnthropicClient;
use crate::services::{classes::ClassExtractor, housekeeping, pipeline::Cloner, storage::ScreenshotStore};
use crate::services::renderer::{ChromeRenderer, RenderSettings};
use crate::state::AppState;

/// Wires the production pipeline. The browser is not launched here; the first
/// clone request does that.
pub async fn build_app(cfg: crate::config::Config) -> anyhow::Result<(axum::Router, AppState)> {
    housekeeping::prepare_screenshot_dir(&cfg.screenshot_dir).await?;

    let model = AnthropicClient::new(&cfg)?;
    tracing::info!(model = %model.model(), class_summary = cfg.include_class_summary, "clone pipeline configured");

    let extractor = if cfg.include_class_summary { Some(ClassExtractor::new(cfg.nav_timeout())?) } else { None };
    let cloner = Cloner::new(
        Arc::new(ChromeRenderer::new(RenderSettings::from_config(&cfg))),
        Arc::new(model),
        extractor,
        ScreenshotStore::new(cfg.screenshot_dir.clone()),
    );

    let state = AppState { cloner: Arc::new(cloner), strict_status: cfg.clone_error_status };
    let router = crate::web::router::build_router(state.clone(), &cfg.cors_origin)?;
    Ok((router, state))
}
