//! Collecting an event stream into one turn.

use futures::stream::BoxStream;
use futures::StreamExt;

use crate::types::*;

/// Everything one `chat_completion` call produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnOutput {
    /// Text deltas concatenated in arrival order.
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<TokenUsage>,
    pub finish_reason: Option<FinishReason>,
    /// Set when the stream ended with an error event.
    pub error: Option<String>,
}

impl TurnOutput {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The assistant message to append to the history for this turn.
    pub fn to_assistant_message(&self) -> ChatMessage {
        if self.tool_calls.is_empty() {
            ChatMessage::assistant(self.text.clone())
        } else {
            let records = self.tool_calls.iter().map(ToolCall::to_record).collect();
            ChatMessage::assistant_with_tool_calls(self.text.clone(), records)
        }
    }
}

/// Drain `stream` into a [`TurnOutput`], stopping at the terminal event.
pub async fn collect_turn(mut stream: BoxStream<'_, StreamEvent>) -> TurnOutput {
    let mut turn = TurnOutput::default();

    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::TextDelta(delta) => turn.text.push_str(&delta.content),
            StreamEvent::ToolCallComplete(call) => turn.tool_calls.push(call),
            StreamEvent::MessageComplete {
                usage,
                finish_reason,
            } => {
                turn.usage = usage;
                turn.finish_reason = finish_reason;
                break;
            }
            StreamEvent::Error(message) => {
                turn.error = Some(message);
                break;
            }
        }
    }

    turn
}
