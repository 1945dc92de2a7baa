//! Observability events and the listener registry.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::context::InvocationContext;
use crate::guardrail::GuardrailVerdict;
use crate::types::ChatRequest;

/// Events fired over the lifetime of one turn.
#[derive(Debug, Clone)]
pub enum TurnEvent {
    /// The turn started.
    TurnStarted { invocation: InvocationContext },
    /// A request is about to be sent to the transport.
    RequestIssued {
        invocation: InvocationContext,
        request: ChatRequest,
    },
    /// One guardrail validated a request.
    GuardrailExecuted {
        invocation: InvocationContext,
        guardrail: String,
        text: String,
        verdict: GuardrailVerdict,
        detail: String,
        /// Wall-clock time of the validate call only.
        duration: Duration,
    },
    /// A round of tool execution is starting.
    ToolRoundStarted {
        invocation: InvocationContext,
        round: usize,
    },
    /// Terminal: the turn completed.
    TurnCompleted { invocation: InvocationContext },
    /// Terminal: the turn failed.
    TurnFailed {
        invocation: InvocationContext,
        error: String,
    },
    /// Terminal: the turn was cancelled via its streaming handle.
    TurnCancelled { invocation: InvocationContext },
}

/// Observer of turn events.
pub trait TurnListener: Send + Sync {
    fn on_event(&self, event: &TurnEvent);
}

/// Fixed set of listeners, notified fire-and-forget.
///
/// A listener's own failure never propagates back into the turn.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Vec<Arc<dyn TurnListener>>,
}

impl ListenerRegistry {
    pub fn new(listeners: Vec<Arc<dyn TurnListener>>) -> Self {
        Self { listeners }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Notify every listener, best-effort.
    pub fn fire(&self, event: &TurnEvent) {
        for listener in &self.listeners {
            if catch_unwind(AssertUnwindSafe(|| listener.on_event(event))).is_err() {
                warn!("turn listener panicked; event dropped for that listener");
            }
        }
    }
}
