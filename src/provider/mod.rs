//! Chat-completion provider trait and the OpenAI-compatible client.

pub mod chat;
pub mod http;
pub mod sanitize;

pub use chat::LlmClient;

use futures::stream::BoxStream;

use crate::tools::ToolDefinition;
use crate::types::{ChatMessage, StreamEvent};

/// Core trait for chat-completion endpoints.
///
/// Implementations never fail the call itself: every transport, status or
/// decoding problem arrives as a single [`StreamEvent::Error`] that ends the
/// stream. A stream that does not fail ends with
/// [`StreamEvent::MessageComplete`].
pub trait ChatProvider: Send + Sync {
    /// Provider name (e.g. "openai-compatible").
    fn provider_name(&self) -> &str;

    /// The model this provider sends requests to.
    fn model_id(&self) -> &str;

    /// Send `messages` (and optionally advertise `tools`) and translate the
    /// response into events.
    ///
    /// With `stream = false` the full response is still delivered as
    /// events, so callers handle both modes the same way.
    fn chat_completion(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        stream: bool,
    ) -> BoxStream<'static, StreamEvent>;

    /// Release any held connection. Safe to call repeatedly.
    fn close(&self);
}
