//! Shared test helpers: SSE bodies and a client pointed at a mock server.
#![allow(dead_code)]

use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::{json, Value};
use wiremock::{MockServer, ResponseTemplate};

use toolwire::config::ClientConfig;
use toolwire::provider::LlmClient;
use toolwire::types::StreamEvent;

pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// A client whose base URL is the mock server's `/v1`.
pub fn client_for(server: &MockServer) -> LlmClient {
    LlmClient::new(
        ClientConfig::builder()
            .base_url(format!("{}/v1", server.uri()))
            .api_key("test-key")
            .model("test-model")
            .timeout_secs(5)
            .build(),
    )
}

/// SSE body: one `data:` event per chunk, then `[DONE]`.
pub fn sse_body(chunks: &[Value]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

pub fn sse_response(chunks: &[Value]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(sse_body(chunks), "text/event-stream")
}

pub fn text_chunk(content: &str) -> Value {
    json!({"choices": [{"index": 0, "delta": {"content": content}}]})
}

pub fn tool_chunk(id: Option<&str>, name: &str, arguments: &str) -> Value {
    let mut call = json!({"index": 0, "function": {"name": name, "arguments": arguments}});
    if let Some(id) = id {
        call["id"] = json!(id);
    }
    json!({"choices": [{"index": 0, "delta": {"tool_calls": [call]}}]})
}

pub fn finish_chunk(reason: &str) -> Value {
    json!({"choices": [{"index": 0, "delta": {}, "finish_reason": reason}]})
}

pub async fn collect_events(mut stream: BoxStream<'_, StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event);
    }
    events
}

/// Exactly one terminal event, and it is the last one.
pub fn assert_terminated_once(events: &[StreamEvent]) {
    assert!(!events.is_empty(), "stream produced no events");
    let terminal: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, event)| event.is_terminal())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(
        terminal,
        vec![events.len() - 1],
        "expected a single trailing terminal event in {events:?}"
    );
}
