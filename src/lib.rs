//! toolwire: the I/O boundary of a tool-calling coding agent.
//!
//! Two halves:
//!
//! - [`provider`] talks to an OpenAI-compatible chat-completions endpoint
//!   (Ollama, vLLM, llama.cpp, ...) and turns its streaming or non-streaming
//!   responses into a uniform sequence of [`StreamEvent`](types::StreamEvent)s.
//!   Tool-call arguments are repaired on the way in and on the way out.
//! - [`tools`] defines the contract every tool implements (schema,
//!   validation, mutation policy, confirmation, execution) and ships a few
//!   built-in tools.
//!
//! Failures never escape as panics or `Err`s at these boundaries: the client
//! ends its stream with one error event and tools return a failed
//! [`ToolResult`](tools::ToolResult).
//!
//! # Quick Start
//!
//! ```no_run
//! use toolwire::prelude::*;
//! use toolwire::tools::{builtin, tool_definitions};
//!
//! # async fn example() {
//! let client = LlmClient::from_env();
//! let tools = builtin::all_tools();
//! let definitions = tool_definitions(&tools);
//!
//! let messages = vec![ChatMessage::user("list files")];
//! let turn = collect_turn(client.chat_completion(&messages, Some(definitions.as_slice()), true)).await;
//! for call in &turn.tool_calls {
//!     if let Some(tool) = tools.iter().find(|t| t.name() == call.name) {
//!         let invocation = ToolInvocation::from_call(call, ".");
//!         if tool.validate_params(&invocation.params).is_empty() {
//!             let result = tool.execute(&invocation).await;
//!             println!("{}", result.to_model_output());
//!         }
//!     }
//! }
//! # }
//! ```

pub mod config;
pub mod error;
pub mod generation;
pub mod prelude;
pub mod provider;
pub mod tools;
pub mod types;
pub mod util;
