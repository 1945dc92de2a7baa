//! Callback registration for one turn, validated before dispatch.

use std::sync::Arc;

use crate::context::InvocationContext;
use crate::error::{Result, TurnstileError};
use crate::model::StreamingHandle;
use crate::tools::ToolExecution;
use crate::types::{ChatResponse, RetrievalResult, ToolCallFragment, ToolExecutionRequest};

/// Context handed to the with-context callback variants.
///
/// Carries the live streaming handle, so with-context subscribers can
/// cancel mid-stream; the plain variants cannot.
#[derive(Clone)]
pub struct TurnContext {
    pub invocation: InvocationContext,
    pub handle: Arc<dyn StreamingHandle>,
}

pub type TextCallback = Arc<dyn Fn(&str) -> Result<()> + Send + Sync>;
pub type ContextTextCallback = Arc<dyn Fn(&TurnContext, &str) -> Result<()> + Send + Sync>;
pub type FragmentCallback = Arc<dyn Fn(&ToolCallFragment) -> Result<()> + Send + Sync>;
pub type ContextFragmentCallback =
    Arc<dyn Fn(&TurnContext, &ToolCallFragment) -> Result<()> + Send + Sync>;
pub type RetrievalCallback = Arc<dyn Fn(&RetrievalResult) -> Result<()> + Send + Sync>;
pub type ResponseCallback = Arc<dyn Fn(&ChatResponse) -> Result<()> + Send + Sync>;
pub type ToolStartCallback = Arc<dyn Fn(&ToolExecutionRequest) -> Result<()> + Send + Sync>;
pub type ToolDoneCallback = Arc<dyn Fn(&ToolExecution) -> Result<()> + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&TurnstileError) -> Result<()> + Send + Sync>;

/// The callbacks registered for one turn.
///
/// For each {plain, with-context} pair at most one side may be set, each
/// singleton callback may be registered once, and exactly one of the
/// error callback and the ignore-errors marker must be chosen.
/// [`TurnSubscribers::validate`] checks all of it before any network
/// call.
#[derive(Clone, Default)]
pub struct TurnSubscribers {
    pub(crate) partial_text: Option<TextCallback>,
    pub(crate) partial_text_with_context: Option<ContextTextCallback>,
    pub(crate) partial_thinking: Option<TextCallback>,
    pub(crate) partial_thinking_with_context: Option<ContextTextCallback>,
    pub(crate) partial_tool_call: Option<FragmentCallback>,
    pub(crate) partial_tool_call_with_context: Option<ContextFragmentCallback>,
    pub(crate) retrieved_context: Option<RetrievalCallback>,
    pub(crate) intermediate_response: Option<ResponseCallback>,
    pub(crate) before_tool_execution: Option<ToolStartCallback>,
    pub(crate) tool_executed: Option<ToolDoneCallback>,
    pub(crate) complete_response: Option<ResponseCallback>,
    pub(crate) error: Option<ErrorCallback>,
    pub(crate) ignore_errors: bool,
    violations: Vec<String>,
}

impl TurnSubscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_partial_text<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<()> + Send + Sync + 'static,
    {
        self.check_once("partial-text", self.partial_text.is_some());
        self.partial_text = Some(Arc::new(f));
        self
    }

    pub fn on_partial_text_with_context<F>(mut self, f: F) -> Self
    where
        F: Fn(&TurnContext, &str) -> Result<()> + Send + Sync + 'static,
    {
        self.check_once(
            "partial-text-with-context",
            self.partial_text_with_context.is_some(),
        );
        self.partial_text_with_context = Some(Arc::new(f));
        self
    }

    pub fn on_partial_thinking<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<()> + Send + Sync + 'static,
    {
        self.check_once("partial-thinking", self.partial_thinking.is_some());
        self.partial_thinking = Some(Arc::new(f));
        self
    }

    pub fn on_partial_thinking_with_context<F>(mut self, f: F) -> Self
    where
        F: Fn(&TurnContext, &str) -> Result<()> + Send + Sync + 'static,
    {
        self.check_once(
            "partial-thinking-with-context",
            self.partial_thinking_with_context.is_some(),
        );
        self.partial_thinking_with_context = Some(Arc::new(f));
        self
    }

    pub fn on_partial_tool_call<F>(mut self, f: F) -> Self
    where
        F: Fn(&ToolCallFragment) -> Result<()> + Send + Sync + 'static,
    {
        self.check_once("partial-tool-call", self.partial_tool_call.is_some());
        self.partial_tool_call = Some(Arc::new(f));
        self
    }

    pub fn on_partial_tool_call_with_context<F>(mut self, f: F) -> Self
    where
        F: Fn(&TurnContext, &ToolCallFragment) -> Result<()> + Send + Sync + 'static,
    {
        self.check_once(
            "partial-tool-call-with-context",
            self.partial_tool_call_with_context.is_some(),
        );
        self.partial_tool_call_with_context = Some(Arc::new(f));
        self
    }

    pub fn on_retrieved_context<F>(mut self, f: F) -> Self
    where
        F: Fn(&RetrievalResult) -> Result<()> + Send + Sync + 'static,
    {
        self.check_once("retrieved-context", self.retrieved_context.is_some());
        self.retrieved_context = Some(Arc::new(f));
        self
    }

    pub fn on_intermediate_response<F>(mut self, f: F) -> Self
    where
        F: Fn(&ChatResponse) -> Result<()> + Send + Sync + 'static,
    {
        self.check_once("intermediate-response", self.intermediate_response.is_some());
        self.intermediate_response = Some(Arc::new(f));
        self
    }

    pub fn on_before_tool_execution<F>(mut self, f: F) -> Self
    where
        F: Fn(&ToolExecutionRequest) -> Result<()> + Send + Sync + 'static,
    {
        self.check_once(
            "before-tool-execution",
            self.before_tool_execution.is_some(),
        );
        self.before_tool_execution = Some(Arc::new(f));
        self
    }

    pub fn on_tool_executed<F>(mut self, f: F) -> Self
    where
        F: Fn(&ToolExecution) -> Result<()> + Send + Sync + 'static,
    {
        self.check_once("tool-executed", self.tool_executed.is_some());
        self.tool_executed = Some(Arc::new(f));
        self
    }

    pub fn on_complete_response<F>(mut self, f: F) -> Self
    where
        F: Fn(&ChatResponse) -> Result<()> + Send + Sync + 'static,
    {
        self.check_once("complete-response", self.complete_response.is_some());
        self.complete_response = Some(Arc::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&TurnstileError) -> Result<()> + Send + Sync + 'static,
    {
        self.check_once("error", self.error.is_some());
        self.error = Some(Arc::new(f));
        self
    }

    /// Swallow turn errors instead of registering an error callback.
    pub fn ignore_errors(mut self) -> Self {
        self.ignore_errors = true;
        self
    }

    fn check_once(&mut self, name: &str, already: bool) {
        if already {
            self.violations
                .push(format!("{name} callback registered twice"));
        }
    }

    /// Check all registration invariants. Called before any network call.
    pub fn validate(&self) -> Result<()> {
        if let Some(violation) = self.violations.first() {
            return Err(TurnstileError::Configuration(violation.clone()));
        }

        let pairs = [
            (
                "partial-text",
                self.partial_text.is_some(),
                self.partial_text_with_context.is_some(),
            ),
            (
                "partial-thinking",
                self.partial_thinking.is_some(),
                self.partial_thinking_with_context.is_some(),
            ),
            (
                "partial-tool-call",
                self.partial_tool_call.is_some(),
                self.partial_tool_call_with_context.is_some(),
            ),
        ];
        for (name, plain, with_context) in pairs {
            if plain && with_context {
                return Err(TurnstileError::Configuration(format!(
                    "both the plain and with-context {name} callbacks are registered; \
                     register at most one of the pair"
                )));
            }
        }

        match (self.error.is_some(), self.ignore_errors) {
            (true, true) => Err(TurnstileError::Configuration(
                "both an error callback and ignore-errors are registered; pick one".to_string(),
            )),
            (false, false) => Err(TurnstileError::Configuration(
                "neither an error callback nor ignore-errors is registered; pick one".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Whether any with-context callback is registered (these receive the
    /// cancellable handle).
    pub fn wants_context(&self) -> bool {
        self.partial_text_with_context.is_some()
            || self.partial_thinking_with_context.is_some()
            || self.partial_tool_call_with_context.is_some()
    }
}
