use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Classes forwarded to the model as a styling fingerprint.
pub const TOP_CLASS_LIMIT: usize = 25;
/// Elements remembered per class; the count keeps growing past this.
pub const SAMPLES_PER_CLASS: usize = 3;
pub const VIEWPORT_WIDTH: u32 = 1280;
pub const VIEWPORT_HEIGHT: u32 = 1080;

#[derive(Debug, Clone, Deserialize)]
pub struct CloneRequest {
    #[serde(default)]
    pub url: Option<String>,
}

impl CloneRequest {
    /// The trimmed url, or `None` when it is missing or blank.
    pub fn target(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementSample {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassGroup {
    pub class_name: String,
    pub occurrence_count: usize,
    pub samples: Vec<ElementSample>,
}

/// What the pipeline hands back. A degraded outcome still carries a page the
/// client can render, plus the reason it is not the real thing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneOutcome {
    Generated { html: String },
    Degraded { html: String, error: String },
}

impl CloneOutcome {
    pub fn html(&self) -> &str {
        match self {
            CloneOutcome::Generated { html } | CloneOutcome::Degraded { html, .. } => html,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, CloneOutcome::Generated { .. })
    }
}

/// Wire body for `/clone`. Clients treat a present `error` as fatal and skip
/// `html`, so a degraded clone reports its reason under `detail` instead.
#[derive(Debug, Clone, Serialize)]
pub struct CloneResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CloneResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, html: None, detail: None, error: Some(error.into()) }
    }
}

impl From<CloneOutcome> for CloneResponse {
    fn from(outcome: CloneOutcome) -> Self {
        match outcome {
            CloneOutcome::Generated { html } => Self { success: true, html: Some(html), detail: None, error: None },
            CloneOutcome::Degraded { html, error } => {
                Self { success: false, html: Some(html), detail: Some(error), error: None }
            }
        }
    }
}
