//! OpenAI-compatible chat-completions client (Ollama, vLLM, llama.cpp, ...).

use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ToolwireError;
use crate::tools::ToolDefinition;
use crate::types::*;

use super::http::{
    bearer_headers, build_client, parse_sse_line, status_to_error, transport_error, SseLine,
};
use super::sanitize::{decode_arguments, sanitize_messages};
use super::ChatProvider;

/// Client for one OpenAI-compatible endpoint.
///
/// The underlying HTTP client is created on first use and cached until
/// [`close`](ChatProvider::close) or drop. Each returned event stream holds
/// its own handle to that client, so closing does not cut off a stream that
/// is already being read; the next call simply reconnects.
///
/// ```no_run
/// use futures::StreamExt;
/// use toolwire::prelude::*;
///
/// # async fn example() {
/// let client = LlmClient::from_env();
/// let mut events = client.chat_completion(&[ChatMessage::user("hi")], None, true);
/// while let Some(event) = events.next().await {
///     if let StreamEvent::TextDelta(delta) = event {
///         print!("{}", delta.content);
///     }
/// }
/// client.close();
/// # }
/// ```
pub struct LlmClient {
    config: ClientConfig,
    client: Mutex<Option<reqwest::Client>>,
}

impl LlmClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            client: Mutex::new(None),
        }
    }

    /// Client configured from `LOCAL_LLM_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Return the cached HTTP client, establishing it if needed.
    pub fn get_client(&self) -> Result<reqwest::Client, ToolwireError> {
        let mut slot = self.slot();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = build_client(&self.config)?;
        debug!(base_url = %self.config.base_url, "established chat client");
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Whether a client is currently cached.
    pub fn is_connected(&self) -> bool {
        self.slot().is_some()
    }

    fn slot(&self) -> MutexGuard<'_, Option<reqwest::Client>> {
        self.client.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn build_request_body(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        stream: bool,
    ) -> Result<Value, ToolwireError> {
        let tools = tools.filter(|tools| !tools.is_empty());
        let body = ChatRequestBody {
            model: &self.config.model,
            messages: sanitize_messages(messages),
            stream,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            tools,
            tool_choice: tools.map(|_| "auto"),
        };
        Ok(serde_json::to_value(&body)?)
    }

    fn prepare(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        stream: bool,
    ) -> Result<PreparedRequest, ToolwireError> {
        Ok(PreparedRequest {
            client: self.get_client()?,
            url: self.config.chat_completions_url(),
            headers: bearer_headers(&self.config.api_key),
            body: self.build_request_body(messages, tools, stream)?,
            timeout_ms: self.config.timeout_secs.saturating_mul(1000),
        })
    }
}

impl ChatProvider for LlmClient {
    fn provider_name(&self) -> &str {
        "openai-compatible"
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }

    fn chat_completion(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        stream: bool,
    ) -> BoxStream<'static, StreamEvent> {
        debug!(
            model = %self.config.model,
            stream,
            tools = tools.map_or(0, <[ToolDefinition]>::len),
            "chat_completion"
        );
        let prepared = self.prepare(messages, tools, stream);

        let events = async_stream::stream! {
            let request = match prepared {
                Ok(request) => request,
                Err(e) => {
                    yield fail(e);
                    return;
                }
            };

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    yield fail(e);
                    return;
                }
            };

            if !stream {
                match read_full_response(response, request.timeout_ms).await {
                    Ok(events) => {
                        for event in events {
                            yield event;
                        }
                    }
                    Err(e) => yield fail(e),
                }
                return;
            }

            let mut decoder = ChunkDecoder::default();
            let mut buffer: Vec<u8> = Vec::new();
            let byte_stream = response.bytes_stream();
            futures::pin_mut!(byte_stream);

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield fail(transport_error(e, request.timeout_ms));
                        return;
                    }
                };
                buffer.extend_from_slice(&chunk);

                while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=line_end).collect();
                    match decoder.decode_line(String::from_utf8_lossy(&line).trim()) {
                        Ok(events) => {
                            for event in events {
                                yield event;
                            }
                        }
                        Err(e) => {
                            yield fail(e);
                            return;
                        }
                    }
                }
            }

            // last line may arrive without a newline
            if !buffer.is_empty() {
                match decoder.decode_line(String::from_utf8_lossy(&buffer).trim()) {
                    Ok(events) => {
                        for event in events {
                            yield event;
                        }
                    }
                    Err(e) => {
                        yield fail(e);
                        return;
                    }
                }
            }

            yield decoder.finish();
        };

        Box::pin(events)
    }

    fn close(&self) {
        if self.slot().take().is_some() {
            debug!(base_url = %self.config.base_url, "closed chat client");
        }
    }
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .field("connected", &self.is_connected())
            .finish()
    }
}

fn fail(error: ToolwireError) -> StreamEvent {
    warn!(error = %error, "chat completion failed");
    StreamEvent::error(error.to_string())
}

struct PreparedRequest {
    client: reqwest::Client,
    url: String,
    headers: HeaderMap,
    body: Value,
    timeout_ms: u64,
}

impl PreparedRequest {
    async fn send(&self) -> Result<reqwest::Response, ToolwireError> {
        let response = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .json(&self.body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "chat completion rejected by endpoint");
            return Err(status_to_error(status.as_u16(), &body));
        }
        Ok(response)
    }
}

async fn read_full_response(
    response: reqwest::Response,
    timeout_ms: u64,
) -> Result<Vec<StreamEvent>, ToolwireError> {
    let raw = response
        .text()
        .await
        .map_err(|e| transport_error(e, timeout_ms))?;
    let data: ChatResponse = serde_json::from_str(&raw)?;
    let choice = data
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ToolwireError::Stream("no choices in response".into()))?;

    let mut decoder = ChunkDecoder::default();
    let mut events = Vec::new();
    if let Some(text) = choice.message.content.filter(|text| !text.is_empty()) {
        events.push(StreamEvent::text(text));
    }
    for call in choice.message.tool_calls.unwrap_or_default() {
        if let Some(call) = decoder.complete_call(call) {
            events.push(StreamEvent::ToolCallComplete(call));
        }
    }
    events.push(StreamEvent::MessageComplete {
        usage: data.usage.map(TokenUsage::from),
        finish_reason: choice.finish_reason.as_deref().and_then(FinishReason::parse),
    });
    Ok(events)
}

/// Per-stream decoding state.
#[derive(Default)]
struct ChunkDecoder {
    calls_emitted: usize,
    usage: Option<TokenUsage>,
    finish_reason: Option<FinishReason>,
    done: bool,
}

impl ChunkDecoder {
    fn decode_line(&mut self, line: &str) -> Result<Vec<StreamEvent>, ToolwireError> {
        if self.done {
            return Ok(Vec::new());
        }
        match parse_sse_line(line) {
            None => Ok(Vec::new()),
            Some(SseLine::Done) => {
                self.done = true;
                Ok(Vec::new())
            }
            Some(SseLine::Data(data)) => {
                let chunk: StreamChunk = serde_json::from_str(data).map_err(|e| {
                    ToolwireError::Stream(format!("undecodable chunk: {e}"))
                })?;
                self.decode_chunk(chunk)
            }
        }
    }

    fn decode_chunk(&mut self, chunk: StreamChunk) -> Result<Vec<StreamEvent>, ToolwireError> {
        if let Some(error) = chunk.error {
            return Err(ToolwireError::Stream(error_text(&error)));
        }
        if let Some(usage) = chunk.usage {
            self.usage = Some(usage.into());
        }

        let mut events = Vec::new();
        let Some(choice) = chunk.choices.into_iter().next() else {
            return Ok(events);
        };
        if let Some(reason) = choice.finish_reason.as_deref().and_then(FinishReason::parse) {
            self.finish_reason = Some(reason);
        }
        if let Some(text) = choice.delta.content.filter(|text| !text.is_empty()) {
            events.push(StreamEvent::text(text));
        }
        for call in choice.delta.tool_calls.unwrap_or_default() {
            if let Some(call) = self.complete_call(call) {
                events.push(StreamEvent::ToolCallComplete(call));
            }
        }
        Ok(events)
    }

    /// Turn a wire tool call into a [`ToolCall`]; fragments without a
    /// function name yield nothing.
    fn complete_call(&mut self, call: WireToolCall) -> Option<ToolCall> {
        let name = call.function.name.filter(|name| !name.is_empty())?;
        let call_id = call
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("call_{}", self.calls_emitted));
        self.calls_emitted += 1;
        Some(ToolCall::new(
            call_id,
            name,
            wire_arguments(call.function.arguments),
        ))
    }

    fn finish(self) -> StreamEvent {
        StreamEvent::MessageComplete {
            usage: self.usage,
            finish_reason: self.finish_reason,
        }
    }
}

/// Arguments usually arrive as a JSON-encoded string, but some servers
/// send the object itself.
fn wire_arguments(raw: Option<Value>) -> Value {
    match raw {
        Some(Value::String(encoded)) => decode_arguments(Some(&encoded)),
        Some(Value::Null) | None => Value::Object(Map::new()),
        Some(other) => other,
    }
}

fn error_text(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

// Wire types (internal)

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<WireUsage>,
    error: Option<Value>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: Option<String>,
    #[serde(default)]
    function: WireFunction,
}

#[derive(Deserialize, Default)]
struct WireFunction {
    name: Option<String>,
    arguments: Option<Value>,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    total_tokens: Option<u32>,
}

impl From<WireUsage> for TokenUsage {
    fn from(usage: WireUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage
                .total_tokens
                .unwrap_or_else(|| usage.prompt_tokens.saturating_add(usage.completion_tokens)),
        }
    }
}
