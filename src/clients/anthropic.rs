use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;
use crate::services::generator::{VisionModel, VisionPrompt};

const API_VERSION: &str = "2023-06-01";

/// Thin client for the Messages API. One request per call, no retries.
#[derive(Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicClient {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Self::with_timeout(cfg, cfg.llm_timeout())
    }

    fn with_timeout(cfg: &Config, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building llm http client")?;
        Ok(Self {
            http,
            api_key: cfg.anthropic_api_key.clone(),
            endpoint: format!("{}/v1/messages", cfg.anthropic_base_url.trim_end_matches('/')),
            model: cfg.anthropic_model.clone(),
            max_tokens: cfg.anthropic_max_tokens,
            temperature: cfg.anthropic_temperature,
        })
    }

    pub fn model(&self) -> &str { &self.model }

    fn body<'a>(&'a self, prompt: &'a VisionPrompt) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: &prompt.system,
            messages: vec![Message {
                role: "user",
                content: vec![
                    Content::Image {
                        source: ImageSource { kind: "base64", media_type: "image/png", data: &prompt.image_png_base64 },
                    },
                    Content::Text { text: &prompt.text },
                ],
            }],
        }
    }
}

#[async_trait]
impl VisionModel for AnthropicClient {
    async fn complete(&self, prompt: &VisionPrompt) -> anyhow::Result<String> {
        let resp = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.body(prompt))
            .send()
            .await
            .context("calling messages api")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| format!("{}: {}", e.error.kind, e.error.message))
                .unwrap_or(text);
            bail!("messages api returned {status}: {detail}");
        }

        let parsed: MessagesResponse = resp.json().await.context("decoding messages api response")?;
        tracing::debug!(model = %self.model, stop_reason = ?parsed.stop_reason, "completion received");
        Ok(parsed.joined_text())
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<Content<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Content<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'static str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}

impl MessagesResponse {
    /// Text of every block in order; non-text blocks contribute nothing.
    fn joined_text(&self) -> String {
        self.content.iter().filter_map(|b| b.text.as_deref()).collect()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}
