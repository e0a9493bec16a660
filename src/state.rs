use crate::services::pipeline::Cloner;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub cloner: Arc<Cloner>,
    /// Map failures to 4xx/5xx instead of answering 200 with an error body.
    pub strict_status: bool,
}
