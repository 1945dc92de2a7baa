//! Guardrails: ordered validation chains around a model exchange.
//!
//! Input guardrails validate the user message before dispatch; output
//! guardrails validate generated text after the model responds. A
//! guardrail may rewrite the text seen by the rest of its chain, fail
//! non-fatally (the chain keeps running and accumulates failures), or
//! fail fatally (the chain halts immediately).

pub mod chain;
pub mod result;

pub use chain::{GuardrailChain, InputGuardrailChain, OutputGuardrailChain};
pub use result::{GuardrailFailure, GuardrailResult, GuardrailVerdict};

use std::sync::Arc;

use crate::context::InvocationContext;
use crate::error::Result;
use crate::turn::events::ListenerRegistry;
use crate::types::{ChatMessage, RetrievalResult};

/// A validator run against a user message or generated text.
pub trait Guardrail: Send + Sync {
    /// Identity used to tag failure records and observability events.
    fn name(&self) -> &str;

    /// Validate the request.
    ///
    /// `Err` is an implementation fault, not a validation failure: it
    /// aborts the whole chain instead of being composed like a
    /// [`GuardrailResult::Failure`].
    fn validate(&self, request: &GuardrailRequest) -> Result<GuardrailResult>;
}

/// Immutable value wrapping the text under validation plus shared turn
/// context.
#[derive(Clone)]
pub struct GuardrailRequest {
    /// User message text for input guardrails, generated text for output
    /// guardrails. Reflects the cumulative effect of prior rewrites.
    pub text: String,
    /// Snapshot of the conversation memory for this slot.
    pub memory: Vec<ChatMessage>,
    /// Retrieval result attached to the turn, if any.
    pub retrieval: Option<RetrievalResult>,
    /// The invocation this validation belongs to.
    pub invocation: InvocationContext,
    /// Registry guardrail events are fired into.
    pub listeners: Arc<ListenerRegistry>,
}

impl GuardrailRequest {
    pub fn new(text: impl Into<String>, invocation: InvocationContext) -> Self {
        Self {
            text: text.into(),
            memory: Vec::new(),
            retrieval: None,
            invocation,
            listeners: Arc::new(ListenerRegistry::empty()),
        }
    }

    pub fn with_memory(mut self, memory: Vec<ChatMessage>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_retrieval(mut self, retrieval: Option<RetrievalResult>) -> Self {
        self.retrieval = retrieval;
        self
    }

    pub fn with_listeners(mut self, listeners: Arc<ListenerRegistry>) -> Self {
        self.listeners = listeners;
        self
    }

    /// Produce the request seen by the next guardrail after a rewrite.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.text = text.into();
        next
    }
}

impl std::fmt::Debug for GuardrailRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardrailRequest")
            .field("text", &self.text)
            .field("memory_len", &self.memory.len())
            .field("retrieval", &self.retrieval.is_some())
            .field("invocation", &self.invocation)
            .finish()
    }
}
