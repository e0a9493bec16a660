use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::clone::CloneOutcome;
use crate::services::classes::ClassExtractor;
use crate::services::generator::{generate_clone, VisionModel};
use crate::services::renderer::Renderer;
use crate::services::storage::ScreenshotStore;
use crate::web::utils::error_page;

/// Screenshot, optional class summary, then generation. One pipeline for both
/// flavours; passing no extractor turns the class summary off.
#[derive(Clone)]
pub struct Cloner {
    renderer: Arc<dyn Renderer>,
    model: Arc<dyn VisionModel>,
    extractor: Option<ClassExtractor>,
    store: ScreenshotStore,
}

impl Cloner {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        model: Arc<dyn VisionModel>,
        extractor: Option<ClassExtractor>,
        store: ScreenshotStore,
    ) -> Self {
        Self { renderer, model, extractor, store }
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    /// Never fails: any stage error becomes a degraded outcome carrying an
    /// error page.
    pub async fn clone_site(&self, url: &str) -> CloneOutcome {
        let request_id = Uuid::new_v4();
        let span = info_span!("clone", %request_id, %url);
        async move {
            match self.run(request_id, url).await {
                Ok(html) => {
                    info!(bytes = html.len(), "clone finished");
                    CloneOutcome::Generated { html }
                }
                Err(e) => {
                    let error = format!("{e:#}");
                    warn!(%error, "clone degraded");
                    CloneOutcome::Degraded { html: error_page(&error), error }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request_id: Uuid, url: &str) -> anyhow::Result<String> {
        let png = self.renderer.capture(url).await?;
        // Held until generation returns; dropping it removes the file.
        let shot = self.store.persist(request_id, png).await?;

        let classes = match &self.extractor {
            Some(extractor) => Some(extractor.top_classes(url).await?),
            None => None,
        };

        generate_clone(self.model.as_ref(), url, shot.path(), classes.as_deref()).await
    }
}
