use anyhow::Context;
use async_trait::async_trait;
use base64::Engine as _;
use std::fmt::Write as _;
use std::path::Path;

use crate::domain::clone::ClassGroup;

pub const SYSTEM_PROMPT: &str = "You are an expert web developer. Create a complete HTML replica based on the screenshot and top 25 classes from the webpage. Return ONLY the HTML code with embedded CSS and JavaScript. No explanations, no markdown blocks, no analysis. Start with <!DOCTYPE html> and end with </html>.";

/// Used when no class summary accompanies the screenshot.
pub const SCREENSHOT_ONLY_PROMPT: &str = "You are an expert web developer. Create a complete HTML replica based on the screenshot of the webpage. Return ONLY the HTML code with embedded CSS and JavaScript. No explanations, no markdown blocks, no analysis. Start with <!DOCTYPE html> and end with </html>.";

/// A single-turn prompt: one PNG plus one text instruction.
#[derive(Debug, Clone)]
pub struct VisionPrompt {
    pub system: String,
    pub image_png_base64: String,
    pub text: String,
}

/// Multimodal completion backend.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn complete(&self, prompt: &VisionPrompt) -> anyhow::Result<String>;
}

pub fn class_summary(classes: &[ClassGroup]) -> String {
    let mut out = String::from("Top CSS classes found on this webpage:\n");
    for group in classes {
        let _ = writeln!(out, "- .{} (used {} times)", group.class_name, group.occurrence_count);
    }
    out
}

pub fn build_prompt(url: &str, image_png_base64: String, classes: Option<&[ClassGroup]>) -> VisionPrompt {
    let summary = classes.map(|c| format!(" {}.", class_summary(c))).unwrap_or_default();
    let text = format!(
        "Clone this website (URL: {url}).{summary} Return ONLY raw HTML code. No markdown, no backticks, no explanations. Just pure HTML starting with <!DOCTYPE html>."
    );
    let system = if classes.is_some() { SYSTEM_PROMPT } else { SCREENSHOT_ONLY_PROMPT };
    VisionPrompt { system: system.to_string(), image_png_base64, text }
}

/// Drops markdown fences the model adds despite being told not to.
pub fn strip_fences(raw: &str) -> String {
    raw.replace("```html", "").replace("```", "").trim().to_string()
}

pub async fn generate_clone(
    model: &dyn VisionModel,
    url: &str,
    screenshot: &Path,
    classes: Option<&[ClassGroup]>,
) -> anyhow::Result<String> {
    let png = tokio::fs::read(screenshot)
        .await
        .with_context(|| format!("reading screenshot {}", screenshot.display()))?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&png);

    let prompt = build_prompt(url, encoded, classes);
    let raw = model.complete(&prompt).await?;
    let html = strip_fences(&raw);
    tracing::info!(%url, bytes = html.len(), "clone generated");
    Ok(html)
}
