//! Ordered guardrail execution.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::result::{GuardrailResult, GuardrailVerdict};
use super::{Guardrail, GuardrailRequest};
use crate::error::{Result, TurnstileError};
use crate::turn::events::TurnEvent;

/// Runs guardrails strictly in list order, never concurrently.
#[derive(Clone, Default)]
pub struct GuardrailChain {
    guardrails: Vec<Arc<dyn Guardrail>>,
}

impl GuardrailChain {
    pub fn new(guardrails: Vec<Arc<dyn Guardrail>>) -> Self {
        Self { guardrails }
    }

    pub fn is_empty(&self) -> bool {
        self.guardrails.is_empty()
    }

    /// Execute the chain against a request.
    ///
    /// Each guardrail sees the cumulative effect of prior rewrites. A
    /// fatal result short-circuits: the accumulated result is discarded
    /// and the fatal result returned as-is.
    pub fn execute(&self, request: GuardrailRequest) -> Result<GuardrailResult> {
        let mut request = request;
        let mut accumulated = GuardrailResult::Success;

        for guardrail in &self.guardrails {
            let started = Instant::now();
            let result = guardrail.validate(&request).map_err(|err| {
                TurnstileError::GuardrailExecution {
                    guardrail: guardrail.name().to_string(),
                    source: Box::new(err),
                }
            })?;
            // Duration covers the validate call only, not event dispatch.
            let duration = started.elapsed();

            let result = tag(result, guardrail.name())?;
            request.listeners.fire(&TurnEvent::GuardrailExecuted {
                invocation: request.invocation.clone(),
                guardrail: guardrail.name().to_string(),
                text: request.text.clone(),
                verdict: GuardrailVerdict::from(&result),
                detail: result.to_string(),
                duration,
            });
            debug!(
                guardrail = guardrail.name(),
                verdict = ?GuardrailVerdict::from(&result),
                elapsed_ms = duration.as_millis() as u64,
                "guardrail executed"
            );

            match result {
                GuardrailResult::Fatal(_) => return Ok(result),
                GuardrailResult::SuccessWith { ref text } => {
                    request = request.with_text(text.clone());
                    accumulated = accumulated.compose(result);
                }
                other => accumulated = accumulated.compose(other),
            }
        }

        Ok(accumulated)
    }
}

/// Tag a single guardrail's result with its identity.
///
/// A single guardrail produces at most one failure record; more is an
/// invalid programming state.
fn tag(result: GuardrailResult, name: &str) -> Result<GuardrailResult> {
    match result {
        GuardrailResult::Failure(mut failures) => {
            check_single(&failures, name)?;
            failures[0].guardrail = Some(name.to_string());
            Ok(GuardrailResult::Failure(failures))
        }
        GuardrailResult::Fatal(mut failures) => {
            check_single(&failures, name)?;
            failures[0].guardrail = Some(name.to_string());
            Ok(GuardrailResult::Fatal(failures))
        }
        other => Ok(other),
    }
}

fn check_single(failures: &[super::GuardrailFailure], name: &str) -> Result<()> {
    if failures.len() != 1 {
        return Err(TurnstileError::InvalidState(format!(
            "guardrail '{name}' produced {} failure records, expected exactly one",
            failures.len()
        )));
    }
    Ok(())
}

/// Input-side chain: enforces the chain result against the user message.
#[derive(Clone, Default)]
pub struct InputGuardrailChain {
    chain: GuardrailChain,
}

impl InputGuardrailChain {
    pub fn new(guardrails: Vec<Arc<dyn Guardrail>>) -> Self {
        Self {
            chain: GuardrailChain::new(guardrails),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Validate the user message, returning the (possibly rewritten) text
    /// or an input-guardrail error on overall non-success.
    pub fn enforce(&self, request: GuardrailRequest) -> Result<String> {
        let original = request.text.clone();
        match self.chain.execute(request)? {
            GuardrailResult::Success => Ok(original),
            GuardrailResult::SuccessWith { text } => Ok(text),
            failed => Err(into_error(failed, true)),
        }
    }
}

/// Output-side chain: structurally identical, run over generated text.
#[derive(Clone, Default)]
pub struct OutputGuardrailChain {
    chain: GuardrailChain,
}

impl OutputGuardrailChain {
    pub fn new(guardrails: Vec<Arc<dyn Guardrail>>) -> Self {
        Self {
            chain: GuardrailChain::new(guardrails),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Validate generated text, returning the (possibly rewritten) text
    /// or an output-guardrail error on overall non-success.
    pub fn enforce(&self, request: GuardrailRequest) -> Result<String> {
        let original = request.text.clone();
        match self.chain.execute(request)? {
            GuardrailResult::Success => Ok(original),
            GuardrailResult::SuccessWith { text } => Ok(text),
            failed => Err(into_error(failed, false)),
        }
    }
}

fn into_error(result: GuardrailResult, input: bool) -> TurnstileError {
    let message = result.to_string();
    let source = match result {
        GuardrailResult::Failure(failures) | GuardrailResult::Fatal(failures) => {
            failures.into_iter().next().and_then(|f| f.source)
        }
        _ => None,
    };
    if input {
        TurnstileError::InputGuardrail { message, source }
    } else {
        TurnstileError::OutputGuardrail { message, source }
    }
}
