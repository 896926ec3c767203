//! Convenience re-exports for common use.

pub use crate::config::ClientConfig;
pub use crate::error::{Result, ToolwireError};
pub use crate::generation::{collect_turn, TurnOutput};
pub use crate::provider::{ChatProvider, LlmClient};
pub use crate::tools::{
    FileDiff, Tool, ToolConfirmation, ToolDefinition, ToolInvocation, ToolKind, ToolResult,
    ToolSchema,
};
pub use crate::types::{
    ChatMessage, FinishReason, Role, StreamEvent, StreamEventType, TextDelta, TokenUsage,
    ToolCall, ToolCallRecord,
};
