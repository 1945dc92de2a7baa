//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use super::arguments::ToolArguments;
use super::types::ToolSpecification;
use crate::context::InvocationContext;
use crate::error::{Result, TurnstileError};

/// Context available during tool execution.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Id of the tool call being served, when the model supplied one.
    pub tool_call_id: Option<String>,
    /// Name of the tool being executed.
    pub tool_name: String,
    /// The invocation this execution belongs to.
    pub invocation: InvocationContext,
}

/// Core tool trait; implement to create custom tools.
///
/// Bodies are dispatched onto the runtime's worker pool, so they must own
/// their inputs.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Declared name, description, and argument schema.
    fn specification(&self) -> &ToolSpecification;

    /// Execute the tool with bound arguments.
    async fn execute(&self, args: ToolArguments, ctx: ToolContext) -> Result<serde_json::Value>;
}

type ToolHandler = dyn Fn(ToolArguments, ToolContext) -> Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send>>
    + Send
    + Sync;

/// Closure-based tool for quick tool creation.
pub struct FnTool {
    specification: ToolSpecification,
    handler: Arc<ToolHandler>,
}

impl FnTool {
    /// Create a tool from a closure.
    pub fn new<F, Fut>(specification: ToolSpecification, handler: F) -> Self
    where
        F: Fn(ToolArguments, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value>> + Send + 'static,
    {
        Self {
            specification,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn specification(&self) -> &ToolSpecification {
        &self.specification
    }

    async fn execute(&self, args: ToolArguments, ctx: ToolContext) -> Result<serde_json::Value> {
        (self.handler)(args, ctx).await
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.specification.name)
            .field("description", &self.specification.description)
            .finish()
    }
}

/// Convenience: a body error for the named tool.
pub fn tool_error(tool_name: &str, message: impl Into<String>) -> TurnstileError {
    TurnstileError::ToolExecution {
        tool_name: tool_name.to_string(),
        message: message.into(),
    }
}
