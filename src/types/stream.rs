//! Streaming event vocabulary.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use super::message::ToolCallRecord;
use super::usage::TokenUsage;

/// One unit of model output, as emitted by
/// [`ChatProvider::chat_completion`](crate::provider::ChatProvider::chat_completion).
///
/// A well-formed event stream ends with exactly one
/// [`MessageComplete`](StreamEvent::MessageComplete) or
/// [`Error`](StreamEvent::Error), never both, and nothing follows it.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental text, in the order it should be concatenated.
    TextDelta(TextDelta),
    /// A fully decoded tool call.
    ToolCallComplete(ToolCall),
    /// The endpoint finished the message.
    MessageComplete {
        usage: Option<TokenUsage>,
        finish_reason: Option<FinishReason>,
    },
    /// The call failed; carries a human-readable reason.
    Error(String),
}

impl StreamEvent {
    pub fn text(content: impl Into<String>) -> Self {
        Self::TextDelta(TextDelta {
            content: content.into(),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn kind(&self) -> StreamEventType {
        match self {
            Self::TextDelta(_) => StreamEventType::TextDelta,
            Self::ToolCallComplete(_) => StreamEventType::ToolCallComplete,
            Self::MessageComplete { .. } => StreamEventType::MessageComplete,
            Self::Error(_) => StreamEventType::Error,
        }
    }

    /// True for the events that end a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::MessageComplete { .. } | Self::Error(_))
    }
}

/// Discriminant of a [`StreamEvent`].
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamEventType {
    TextDelta,
    ToolCallComplete,
    MessageComplete,
    Error,
}

/// Incremental text fragment. Never empty when carried by an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDelta {
    pub content: String,
}

/// A decoded request to invoke a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider id, or `call_<n>` when the provider sent none.
    pub call_id: String,
    pub name: String,
    /// Parsed arguments; a raw string when nothing could decode them.
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(call_id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Arguments as an object map, if they decoded to one.
    pub fn arguments_map(&self) -> Option<&Map<String, Value>> {
        self.arguments.as_object()
    }

    /// Whether the arguments survived only as an undecodable string.
    pub fn has_raw_arguments(&self) -> bool {
        self.arguments.is_string()
    }

    /// The form this call takes when replayed in conversation history.
    pub fn to_record(&self) -> ToolCallRecord {
        ToolCallRecord::new(self.call_id.clone(), self.name.clone(), self.arguments.clone())
    }
}

/// Why generation finished.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}

impl FinishReason {
    /// Parse the provider's `finish_reason`; unknown values map to `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}
