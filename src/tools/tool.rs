//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::schema::{ToolDefinition, ToolSchema};
use super::types::{ToolConfirmation, ToolInvocation, ToolKind, ToolResult};

/// Core tool trait. Implement to create custom tools.
///
/// A dispatcher drives a decoded call through [`validate_params`](Tool::validate_params),
/// [`get_confirmation`](Tool::get_confirmation) and [`execute`](Tool::execute),
/// in that order; nothing here enforces the ordering.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    fn kind(&self) -> ToolKind;

    /// Parameter schema.
    fn schema(&self) -> &ToolSchema;

    /// Perform the tool's effect. Expected failures come back as
    /// [`ToolResult::error_result`], never as a panic.
    async fn execute(&self, invocation: &ToolInvocation) -> ToolResult;

    /// One message per violated field; empty means valid.
    fn validate_params(&self, params: &Map<String, Value>) -> Vec<String> {
        self.schema().validate(params)
    }

    fn is_mutating(&self, _params: &Map<String, Value>) -> bool {
        self.kind().is_mutating_kind()
    }

    /// `None` for non-mutating invocations, a [`ToolConfirmation`] otherwise.
    async fn get_confirmation(&self, invocation: &ToolInvocation) -> Option<ToolConfirmation> {
        if !self.is_mutating(&invocation.params) {
            return None;
        }
        Some(ToolConfirmation::new(self.name(), invocation.params.clone()))
    }

    /// Declaration for the `tools` array of a chat request.
    fn to_external_schema(&self) -> ToolDefinition {
        ToolDefinition::new(
            self.name(),
            self.description(),
            self.schema().parameters().clone(),
        )
    }
}

type ToolHandler =
    dyn Fn(ToolInvocation) -> Pin<Box<dyn Future<Output = ToolResult> + Send>> + Send + Sync;

/// Closure-based tool for quick tool creation.
pub struct FnTool {
    name: String,
    description: String,
    kind: ToolKind,
    schema: ToolSchema,
    handler: Arc<ToolHandler>,
}

impl FnTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        kind: ToolKind,
        schema: ToolSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolInvocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            schema,
            handler: Arc::new(move |invocation| Box::pin(handler(invocation))),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn execute(&self, invocation: &ToolInvocation) -> ToolResult {
        (self.handler)(invocation.clone()).await
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}
