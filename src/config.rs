use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub anthropic_api_key: String,
    #[serde(default = "default_base_url")]
    pub anthropic_base_url: String,
    #[serde(default = "default_model")]
    pub anthropic_model: String,
    #[serde(default = "default_max_tokens")]
    pub anthropic_max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub anthropic_temperature: f32,
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    #[serde(default = "default_true")]
    pub include_class_summary: bool,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_nav_timeout_ms")]
    pub nav_timeout_ms: u64,
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,
    #[serde(default)]
    pub chrome_path: Option<String>,
    #[serde(default)]
    pub clone_error_status: bool,
}
fn default_base_url() -> String { "https://api.anthropic.com".into() }
fn default_model() -> String { "claude-sonnet-4-20250514".into() }
fn default_max_tokens() -> u32 { 8000 }
fn default_temperature() -> f32 { 0.1 }
fn default_llm_timeout_secs() -> u64 { 300 }
fn default_port() -> u16 { 8000 }
fn default_cors_origin() -> String { "http://localhost:3000".into() }
fn default_true() -> bool { true }
fn default_settle_ms() -> u64 { 2000 }
fn default_nav_timeout_ms() -> u64 { 10_000 }
fn default_screenshot_dir() -> PathBuf { PathBuf::from("images") }

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; `load` passes the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let anthropic_api_key = get("ANTHROPIC_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("ANTHROPIC_API_KEY must be set"))?;
        let flag = |key: &str| get(key).and_then(|v| parse_flag(&v));

        Ok(Self {
            anthropic_api_key,
            anthropic_base_url: get("ANTHROPIC_BASE_URL").unwrap_or_else(default_base_url),
            anthropic_model: get("ANTHROPIC_MODEL").unwrap_or_else(default_model),
            anthropic_max_tokens: parsed(&get, "ANTHROPIC_MAX_TOKENS").unwrap_or(default_max_tokens()),
            anthropic_temperature: parsed(&get, "ANTHROPIC_TEMPERATURE").unwrap_or(default_temperature()),
            llm_timeout_secs: parsed(&get, "LLM_TIMEOUT_SECS").unwrap_or(default_llm_timeout_secs()),
            port: parsed(&get, "PORT").unwrap_or(default_port()),
            cors_origin: get("CORS_ORIGIN").unwrap_or_else(default_cors_origin),
            include_class_summary: flag("INCLUDE_CLASS_SUMMARY").unwrap_or(true),
            settle_ms: parsed(&get, "SETTLE_MS").unwrap_or(default_settle_ms()),
            nav_timeout_ms: parsed(&get, "NAV_TIMEOUT_MS").unwrap_or(default_nav_timeout_ms()),
            screenshot_dir: get("SCREENSHOT_DIR").map(PathBuf::from).unwrap_or_else(default_screenshot_dir),
            chrome_path: get("CHROME_PATH").filter(|p| !p.trim().is_empty()),
            clone_error_status: flag("CLONE_ERROR_STATUS").unwrap_or(false),
        })
    }

    pub fn from_map(vars: &HashMap<&str, &str>) -> anyhow::Result<Self> {
        Self::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    pub fn settle(&self) -> Duration { Duration::from_millis(self.settle_ms) }
    pub fn nav_timeout(&self) -> Duration { Duration::from_millis(self.nav_timeout_ms) }
    pub fn llm_timeout(&self) -> Duration { Duration::from_secs(self.llm_timeout_secs) }
}

fn parsed<T: std::str::FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    get(key).and_then(|v| v.trim().parse().ok())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
