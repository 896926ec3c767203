//! Tool contract for function calling, plus built-in tools.

pub mod arguments;
pub mod builtin;
pub mod diff;
pub mod schema;
pub mod scout;
pub mod tool;
pub mod types;
pub mod validation;

use std::sync::Arc;

pub use arguments::ToolArguments;
pub use diff::FileDiff;
pub use schema::{FunctionDefinition, ParameterBuilder, ToolDefinition, ToolSchema, TypedSchema};
pub use scout::{CodebaseScout, IndexPolicy, LexicalIndex, SearchHit, SemanticSearch};
pub use tool::{FnTool, Tool};
pub use types::{ToolConfirmation, ToolInvocation, ToolKind, ToolResult};

/// Declarations for every tool, in order, for a chat request's `tools`.
pub fn tool_definitions(tools: &[Arc<dyn Tool>]) -> Vec<ToolDefinition> {
    tools.iter().map(|tool| tool.to_external_schema()).collect()
}
