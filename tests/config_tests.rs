//! Tests for client configuration.

use std::sync::{Mutex, OnceLock};

use pretty_assertions::assert_eq;

use toolwire::config::ClientConfig;
use toolwire::error::ToolwireError;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const CONFIG_ENV_VARS: [&str; 6] = [
    "LOCAL_LLM_URL",
    "LOCAL_LLM_API_KEY",
    "LOCAL_LLM_MODEL",
    "LOCAL_LLM_TEMPERATURE",
    "LOCAL_LLM_MAX_TOKENS",
    "LOCAL_LLM_TIMEOUT_SECS",
];

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn capture(keys: &[&str]) -> Self {
        let saved = keys
            .iter()
            .map(|key| ((*key).to_string(), std::env::var(key).ok()))
            .collect();
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

fn env_lock_guard() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn clean_env() -> EnvGuard {
    let guard = EnvGuard::capture(&CONFIG_ENV_VARS);
    for key in CONFIG_ENV_VARS {
        std::env::remove_var(key);
    }
    guard
}

#[test]
fn defaults_target_local_ollama() {
    let config = ClientConfig::default();
    assert_eq!(config.base_url, "http://localhost:11434/v1");
    assert_eq!(config.api_key, "ollama");
    assert_eq!(config.model, "llama3.1");
    assert_eq!(config.temperature, 0.1);
    assert_eq!(config.max_tokens, None);
    assert_eq!(config.timeout_secs, 120);
    assert_eq!(
        config.chat_completions_url(),
        "http://localhost:11434/v1/chat/completions"
    );
}

#[test]
fn completions_url_ignores_trailing_slash() {
    let config = ClientConfig::builder().base_url("http://gpu-box:8000/v1/").build();
    assert_eq!(config.chat_completions_url(), "http://gpu-box:8000/v1/chat/completions");
}

#[test]
fn toml_keeps_defaults_for_absent_keys() {
    let config = ClientConfig::from_toml_str(
        r#"
        model = "qwen2.5-coder:7b"
        max_tokens = 2048
        "#,
    )
    .unwrap();

    assert_eq!(config.model, "qwen2.5-coder:7b");
    assert_eq!(config.max_tokens, Some(2048));
    assert_eq!(config.base_url, "http://localhost:11434/v1");
    assert_eq!(config.temperature, 0.1);
}

#[test]
fn invalid_toml_is_a_configuration_error() {
    let err = ClientConfig::from_toml_str("temperature = \"hot\"").unwrap_err();
    assert!(matches!(err, ToolwireError::Configuration(_)), "{err:?}");
}

#[test]
fn environment_overrides_defaults() {
    let _lock = env_lock_guard();
    let _env = clean_env();
    std::env::set_var("LOCAL_LLM_URL", "http://vllm:8000/v1");
    std::env::set_var("LOCAL_LLM_MODEL", "deepseek-coder");
    std::env::set_var("LOCAL_LLM_TEMPERATURE", "0.7");
    std::env::set_var("LOCAL_LLM_MAX_TOKENS", "512");

    let config = ClientConfig::from_env();

    assert_eq!(config.base_url, "http://vllm:8000/v1");
    assert_eq!(config.model, "deepseek-coder");
    assert_eq!(config.temperature, 0.7);
    assert_eq!(config.max_tokens, Some(512));
    assert_eq!(config.api_key, "ollama");
}

#[test]
fn unparseable_numbers_are_ignored() {
    let _lock = env_lock_guard();
    let _env = clean_env();
    std::env::set_var("LOCAL_LLM_TEMPERATURE", "warm");
    std::env::set_var("LOCAL_LLM_TIMEOUT_SECS", "-5");

    let config = ClientConfig::default().with_env_overrides();

    assert_eq!(config.temperature, 0.1);
    assert_eq!(config.timeout_secs, 120);
}

#[test]
fn file_then_environment_layering() {
    let _lock = env_lock_guard();
    let _env = clean_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("toolwire.toml");
    std::fs::write(&path, "model = \"from-file\"\ntimeout_secs = 30\n").unwrap();
    std::env::set_var("LOCAL_LLM_TIMEOUT_SECS", "45");

    let config = ClientConfig::load(&path).unwrap();

    assert_eq!(config.model, "from-file");
    assert_eq!(config.timeout_secs, 45);
}

#[test]
fn missing_file_is_a_configuration_error() {
    let err = ClientConfig::load("/definitely/not/here.toml").unwrap_err();
    assert!(err.to_string().starts_with("Configuration error: failed to read"));
}
