//! Tool-related types: kinds, invocations, results, confirmations.

use std::path::{Path, PathBuf};

use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use super::arguments::ToolArguments;
use super::diff::FileDiff;
use crate::error::ToolwireError;
use crate::types::ToolCall;

/// Classification of a tool's effect.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ToolKind {
    Read,
    Write,
    Shell,
    Network,
    Memory,
    Mcp,
}

impl ToolKind {
    /// Kinds that need confirmation before running.
    pub fn is_mutating_kind(self) -> bool {
        matches!(self, Self::Write | Self::Shell | Self::Network | Self::Memory)
    }
}

/// One call site: parameters bound to a tool, plus the working directory
/// relative paths resolve against.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub params: Map<String, Value>,
    pub cwd: PathBuf,
}

impl ToolInvocation {
    pub fn new(params: Map<String, Value>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            params,
            cwd: cwd.into(),
        }
    }

    /// Build from a decoded call. Arguments that did not decode to an object
    /// bind no parameters, so validation reports what is missing.
    pub fn from_call(call: &ToolCall, cwd: impl Into<PathBuf>) -> Self {
        Self::new(call.arguments_map().cloned().unwrap_or_default(), cwd)
    }

    /// Build from a JSON object literal; other values bind no parameters.
    pub fn from_value(params: Value, cwd: impl Into<PathBuf>) -> Self {
        match params {
            Value::Object(map) => Self::new(map, cwd),
            _ => Self::new(Map::new(), cwd),
        }
    }

    pub fn args(&self) -> ToolArguments<'_> {
        ToolArguments::new(&self.params)
    }

    /// Resolve `path` against `cwd` unless it is already absolute.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

/// Outcome of executing a tool.
///
/// `error` is set exactly when the result is a failure; both are only
/// reachable through [`success_result`](Self::success_result) and
/// [`error_result`](Self::error_result).
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    success: bool,
    error: Option<String>,
    pub output: String,
    pub metadata: Map<String, Value>,
    pub truncated: bool,
    pub diff: Option<FileDiff>,
    pub exit_code: Option<i32>,
}

impl ToolResult {
    pub fn success_result(output: impl Into<String>) -> Self {
        Self {
            success: true,
            error: None,
            output: output.into(),
            metadata: Map::new(),
            truncated: false,
            diff: None,
            exit_code: None,
        }
    }

    /// A failure with empty output; add output with [`with_output`](Self::with_output).
    pub fn error_result(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::success_result("")
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }

    pub fn with_diff(mut self, diff: FileDiff) -> Self {
        self.diff = Some(diff);
        self
    }

    pub fn with_exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The text fed back to the model for this result.
    pub fn to_model_output(&self) -> String {
        match &self.error {
            None => self.output.clone(),
            Some(error) => format!("Error: {error}\n\nOutput:\n{}", self.output),
        }
    }
}

impl From<ToolwireError> for ToolResult {
    fn from(error: ToolwireError) -> Self {
        Self::error_result(error.to_string())
    }
}

/// A request for approval before a mutating action runs.
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct ToolConfirmation {
    #[builder(into)]
    pub tool_name: String,
    pub params: Map<String, Value>,
    #[builder(into)]
    pub description: String,
    pub diff: Option<FileDiff>,
    #[builder(default)]
    pub affected_paths: Vec<PathBuf>,
    #[builder(into)]
    pub command: Option<String>,
    #[builder(default)]
    pub is_dangerous: bool,
}

impl ToolConfirmation {
    /// The minimal confirmation: `"Execute <name>"` with the raw params.
    pub fn new(tool_name: impl Into<String>, params: Map<String, Value>) -> Self {
        let tool_name = tool_name.into();
        Self::builder()
            .description(format!("Execute {tool_name}"))
            .tool_name(tool_name)
            .params(params)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_read_and_mcp_are_non_mutating() {
        for kind in [ToolKind::Write, ToolKind::Shell, ToolKind::Network, ToolKind::Memory] {
            assert!(kind.is_mutating_kind(), "{kind}");
        }
        assert!(!ToolKind::Read.is_mutating_kind());
        assert!(!ToolKind::Mcp.is_mutating_kind());
    }

    #[test]
    fn kind_names_are_lowercase() {
        assert_eq!(ToolKind::Shell.to_string(), "shell");
        assert_eq!("mcp".parse::<ToolKind>().unwrap(), ToolKind::Mcp);
        assert_eq!(serde_json::to_value(ToolKind::Network).unwrap(), json!("network"));
    }

    #[test]
    fn error_results_carry_error_and_output() {
        let result = ToolResult::error_result("exit status 2").with_output("partial");
        assert!(!result.is_success());
        assert_eq!(result.error(), Some("exit status 2"));
        assert_eq!(
            result.to_model_output(),
            "Error: exit status 2\n\nOutput:\npartial"
        );

        let ok = ToolResult::success_result("done").with_metadata("lines", 3);
        assert!(ok.is_success());
        assert_eq!(ok.error(), None);
        assert_eq!(ok.to_model_output(), "done");
        assert_eq!(ok.metadata["lines"], 3);
    }

    #[test]
    fn errors_convert_to_failed_results() {
        let result = ToolResult::from(ToolwireError::tool("shell", "spawn failed"));
        assert_eq!(
            result.error(),
            Some("Tool execution error: shell: spawn failed")
        );
        assert_eq!(result.output, "");
    }

    #[test]
    fn relative_paths_resolve_against_cwd() {
        let invocation = ToolInvocation::from_value(json!({"path": "a.txt"}), "/work");
        assert_eq!(invocation.resolve_path("a.txt"), PathBuf::from("/work/a.txt"));
        assert_eq!(invocation.resolve_path("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }

    #[test]
    fn raw_string_arguments_bind_nothing() {
        let call = ToolCall::new("call_0", "ls", json!("{broken"));
        assert!(ToolInvocation::from_call(&call, ".").params.is_empty());
    }
}
