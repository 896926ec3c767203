//! Typed access to tool invocation parameters.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ToolwireError;

/// Borrowed view over [`ToolInvocation::params`](super::ToolInvocation::params)
/// providing typed extraction.
#[derive(Debug, Clone, Copy)]
pub struct ToolArguments<'a> {
    params: &'a Map<String, Value>,
}

impl<'a> ToolArguments<'a> {
    pub fn new(params: &'a Map<String, Value>) -> Self {
        Self { params }
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&'a str, ToolwireError> {
        self.get_str_opt(key)
            .ok_or_else(|| missing("string", key))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&'a str> {
        self.params.get(key).and_then(Value::as_str)
    }

    /// Get an integer argument.
    pub fn get_i64(&self, key: &str) -> Result<i64, ToolwireError> {
        self.get_i64_opt(key)
            .ok_or_else(|| missing("integer", key))
    }

    pub fn get_i64_opt(&self, key: &str) -> Option<i64> {
        self.params.get(key).and_then(Value::as_i64)
    }

    /// Get an optional non-negative integer argument.
    pub fn get_u64_opt(&self, key: &str) -> Option<u64> {
        self.params.get(key).and_then(Value::as_u64)
    }

    /// Get a boolean argument.
    pub fn get_bool(&self, key: &str) -> Result<bool, ToolwireError> {
        self.params
            .get(key)
            .and_then(Value::as_bool)
            .ok_or_else(|| missing("boolean", key))
    }

    /// Deserialize all parameters into a typed struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ToolwireError> {
        serde_json::from_value(Value::Object(self.params.clone())).map_err(|e| {
            ToolwireError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}

fn missing(kind: &str, key: &str) -> ToolwireError {
    ToolwireError::InvalidArgument(format!("Missing {kind} argument: {key}"))
}
