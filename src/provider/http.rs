//! HTTP client construction, SSE line parsing, and status mapping.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::config::ClientConfig;
use crate::error::ToolwireError;

/// Build a fresh reqwest client for `config`.
pub fn build_client(config: &ClientConfig) -> Result<reqwest::Client, ToolwireError> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .pool_max_idle_per_host(10)
        .build()
        .map_err(ToolwireError::Network)
}

/// Build default headers for a Bearer-token API.
///
/// An empty key sends no `Authorization` header.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if !api_key.is_empty() {
        if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
            headers.insert(AUTHORIZATION, val);
        }
    }
    headers
}

/// One meaningful SSE line.
#[derive(Debug, PartialEq, Eq)]
pub enum SseLine<'a> {
    Data(&'a str),
    Done,
}

/// Parse a trimmed SSE line. Comments, blank lines and non-data fields
/// (`event:`, `id:`, `retry:`) yield `None`.
pub fn parse_sse_line(line: &str) -> Option<SseLine<'_>> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return Some(SseLine::Done);
    }
    if data.is_empty() {
        return None;
    }
    Some(SseLine::Data(data))
}

/// Map a non-success HTTP status and body to an error.
pub fn status_to_error(status: u16, body: &str) -> ToolwireError {
    match status {
        401 | 403 => ToolwireError::Authentication(body.to_string()),
        429 => ToolwireError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => ToolwireError::api(status, error_message(body)),
    }
}

/// Map a transport failure, surfacing timeouts as such.
pub fn transport_error(error: reqwest::Error, timeout_ms: u64) -> ToolwireError {
    if error.is_timeout() {
        ToolwireError::Timeout(timeout_ms)
    } else {
        ToolwireError::Network(error)
    }
}

/// Prefer `error.message` from an OpenAI-style error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|m| m.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}
