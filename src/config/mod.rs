//! Client configuration (layered: defaults < TOML file < environment).

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, ToolwireError};

/// Local Ollama-style OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_API_KEY: &str = "ollama";
pub const DEFAULT_MODEL: &str = "llama3.1";
pub const DEFAULT_TEMPERATURE: f64 = 0.1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Endpoint and generation settings for [`LlmClient`](crate::provider::LlmClient).
///
/// These are fixed per client; nothing in the streaming contract depends on
/// them beyond being copied into each request.
///
/// ```
/// use toolwire::config::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .model("qwen2.5-coder")
///     .temperature(0.0)
///     .build();
/// assert_eq!(config.base_url, "http://localhost:11434/v1");
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    #[builder(into, default = DEFAULT_BASE_URL.to_string())]
    pub base_url: String,
    #[builder(into, default = DEFAULT_API_KEY.to_string())]
    pub api_key: String,
    #[builder(into, default = DEFAULT_MODEL.to_string())]
    pub model: String,
    #[builder(default = DEFAULT_TEMPERATURE)]
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    #[builder(default = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientConfig {
    /// Defaults overridden by `LOCAL_LLM_*` environment variables.
    ///
    /// Loads `.env` first when present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // missing .env is fine
        Self::default().with_env_overrides()
    }

    /// Parse a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| ToolwireError::Configuration(e.to_string()))
    }

    /// Load a TOML file, then apply environment overrides on top.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ToolwireError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        let _ = dotenvy::dotenv();
        Ok(Self::from_toml_str(&raw)?.with_env_overrides())
    }

    /// Apply `LOCAL_LLM_*` overrides to this config.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("LOCAL_LLM_URL") {
            self.base_url = url;
        }
        if let Ok(key) = std::env::var("LOCAL_LLM_API_KEY") {
            self.api_key = key;
        }
        if let Ok(model) = std::env::var("LOCAL_LLM_MODEL") {
            self.model = model;
        }
        if let Some(temperature) = parse_env("LOCAL_LLM_TEMPERATURE") {
            self.temperature = temperature;
        }
        if let Some(max_tokens) = parse_env("LOCAL_LLM_MAX_TOKENS") {
            self.max_tokens = Some(max_tokens);
        }
        if let Some(timeout) = parse_env("LOCAL_LLM_TIMEOUT_SECS") {
            self.timeout_secs = timeout;
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full URL of the chat-completions endpoint.
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}
