//! Tool invocation with distinguishable error policies.
//!
//! A malformed call is a protocol-shape problem; a tool body failure is a
//! business-logic problem. The two route to independent handlers, each of
//! which decides between synthesizing a tool-result message for the model
//! and aborting the turn.

use std::sync::Arc;

use tracing::warn;

use super::arguments::ToolArguments;
use super::tool::{Tool, ToolContext};
use super::types::ToolSpecification;
use crate::context::InvocationContext;
use crate::error::{Result, TurnstileError};
use crate::types::ToolExecutionRequest;

/// Default bound on sequential tool rounds per turn.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 20;

/// What an error policy decides for a failed tool invocation.
pub enum ToolErrorAction {
    /// Continue the conversation with this synthesized tool result.
    SynthesizeResult(serde_json::Value),
    /// Abort the turn, surfacing the failure through the error path.
    Abort,
}

/// Policy hook invoked when a tool call fails.
pub type ToolErrorHandler =
    Arc<dyn Fn(&ToolExecutionRequest, &TurnstileError) -> ToolErrorAction + Send + Sync>;

/// One executed tool call and its outcome.
#[derive(Debug, Clone)]
pub struct ToolExecution {
    pub request: ToolExecutionRequest,
    pub result: serde_json::Value,
    pub is_error: bool,
}

/// Executes requested tools, bounded per turn.
#[derive(Clone)]
pub struct ToolExecutor {
    tools: Vec<Arc<dyn Tool>>,
    max_rounds: usize,
    on_arguments_error: ToolErrorHandler,
    on_execution_error: ToolErrorHandler,
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ToolExecutor {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            tools,
            max_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            on_arguments_error: default_error_handler(),
            on_execution_error: default_error_handler(),
        }
    }

    /// Bound on sequential tool rounds per turn. Unbounded recursion is a
    /// design defect, so zero is rejected.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        assert!(max_rounds > 0, "tool round bound must be positive");
        self.max_rounds = max_rounds;
        self
    }

    /// Policy for calls whose arguments fail to bind (including unknown
    /// tool names).
    pub fn on_arguments_error(mut self, handler: ToolErrorHandler) -> Self {
        self.on_arguments_error = handler;
        self
    }

    /// Policy for tool bodies that raise.
    pub fn on_execution_error(mut self, handler: ToolErrorHandler) -> Self {
        self.on_execution_error = handler;
        self
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Specifications of all registered tools, for the outgoing request.
    pub fn specifications(&self) -> Vec<ToolSpecification> {
        self.tools
            .iter()
            .map(|t| t.specification().clone())
            .collect()
    }

    /// Execute one requested tool call.
    ///
    /// The body runs as a spawned task so a slow tool does not block the
    /// caller's event-delivery task. `Err` means the active policy chose
    /// to abort the turn.
    pub async fn execute(
        &self,
        request: &ToolExecutionRequest,
        invocation: &InvocationContext,
    ) -> Result<ToolExecution> {
        let Some(tool) = self
            .tools
            .iter()
            .find(|t| t.specification().name == request.name)
        else {
            let err = TurnstileError::ToolArguments {
                tool_name: request.name.clone(),
                message: "unknown tool".to_string(),
            };
            warn!(tool = %request.name, "model requested an unknown tool");
            return self.apply(&self.on_arguments_error, request, err);
        };

        let args = match ToolArguments::parse(&request.arguments) {
            Ok(args) => args,
            Err(parse_err) => {
                let err = TurnstileError::ToolArguments {
                    tool_name: request.name.clone(),
                    message: parse_err.to_string(),
                };
                warn!(tool = %request.name, error = %parse_err, "tool arguments failed to bind");
                return self.apply(&self.on_arguments_error, request, err);
            }
        };

        let ctx = ToolContext {
            tool_call_id: request.id.clone(),
            tool_name: request.name.clone(),
            invocation: invocation.clone(),
        };
        let tool = Arc::clone(tool);
        let task = tokio::spawn(async move { tool.execute(args, ctx).await });

        match task.await {
            Ok(Ok(value)) => Ok(ToolExecution {
                request: request.clone(),
                result: value,
                is_error: false,
            }),
            Ok(Err(body_err)) => {
                warn!(tool = %request.name, error = %body_err, "tool execution failed");
                self.apply(&self.on_execution_error, request, body_err)
            }
            Err(join_err) => {
                let err = TurnstileError::ToolExecution {
                    tool_name: request.name.clone(),
                    message: format!("tool task failed: {join_err}"),
                };
                warn!(tool = %request.name, "tool task panicked or was aborted");
                self.apply(&self.on_execution_error, request, err)
            }
        }
    }

    fn apply(
        &self,
        handler: &ToolErrorHandler,
        request: &ToolExecutionRequest,
        err: TurnstileError,
    ) -> Result<ToolExecution> {
        match handler(request, &err) {
            ToolErrorAction::SynthesizeResult(value) => Ok(ToolExecution {
                request: request.clone(),
                result: value,
                is_error: true,
            }),
            ToolErrorAction::Abort => Err(err),
        }
    }
}

/// Default policy: describe the failure to the model and keep going.
pub fn default_error_handler() -> ToolErrorHandler {
    Arc::new(|_request, err| {
        ToolErrorAction::SynthesizeResult(serde_json::json!({ "error": err.to_string() }))
    })
}

/// Policy that aborts the turn on any failure.
pub fn abort_error_handler() -> ToolErrorHandler {
    Arc::new(|_request, _err| ToolErrorAction::Abort)
}
