//! Guardrail outcomes and their composition.

use std::fmt;

/// Outcome of validating one request against one or more guardrails.
#[derive(Debug)]
pub enum GuardrailResult {
    /// The text passed unchanged.
    Success,
    /// The text passed, rewritten; subsequent guardrails see `text`.
    SuccessWith { text: String },
    /// Validation failed; the chain keeps running and accumulates.
    Failure(Vec<GuardrailFailure>),
    /// Validation failed and the remaining chain must not run.
    Fatal(Vec<GuardrailFailure>),
}

impl GuardrailResult {
    pub fn success() -> Self {
        Self::Success
    }

    pub fn rewrite(text: impl Into<String>) -> Self {
        Self::SuccessWith { text: text.into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(vec![GuardrailFailure::new(message)])
    }

    pub fn failure_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Failure(vec![GuardrailFailure::with_source(message, source)])
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(vec![GuardrailFailure::new(message)])
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::SuccessWith { .. })
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    pub fn failures(&self) -> &[GuardrailFailure] {
        match self {
            Self::Failure(failures) | Self::Fatal(failures) => failures,
            _ => &[],
        }
    }

    /// Fold another result into this one.
    ///
    /// Pure `Success` loses to anything non-trivial; of two rewrites the
    /// later wins (it already saw the earlier one's effect); two
    /// failure-carrying results concatenate their records in chain order,
    /// fatal dominating.
    pub fn compose(self, other: GuardrailResult) -> GuardrailResult {
        use GuardrailResult::*;
        match (self, other) {
            (Success, b) => b,
            (a, Success) => a,
            (SuccessWith { .. }, b @ SuccessWith { .. }) => b,
            (a @ (SuccessWith { .. } | Failure(_) | Fatal(_)), SuccessWith { .. }) => a,
            (SuccessWith { .. }, b @ (Failure(_) | Fatal(_))) => b,
            (Failure(mut a), Failure(b)) => {
                a.extend(b);
                Failure(a)
            }
            (Failure(mut a), Fatal(b)) | (Fatal(mut a), Failure(b)) | (Fatal(mut a), Fatal(b)) => {
                a.extend(b);
                Fatal(a)
            }
        }
    }
}

impl fmt::Display for GuardrailResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::SuccessWith { text } => write!(f, "success with rewrite: {text:?}"),
            Self::Failure(failures) => write!(f, "failure: [{}]", join(failures)),
            Self::Fatal(failures) => write!(f, "fatal: [{}]", join(failures)),
        }
    }
}

fn join(failures: &[GuardrailFailure]) -> String {
    failures
        .iter()
        .map(GuardrailFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// One validation failure record.
#[derive(Debug)]
pub struct GuardrailFailure {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Name of the guardrail that produced this record, filled in by the
    /// chain.
    pub guardrail: Option<String>,
}

impl GuardrailFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
            guardrail: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source),
            guardrail: None,
        }
    }
}

impl fmt::Display for GuardrailFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.guardrail {
            Some(name) => write!(f, "{name}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Compact classification of a result, carried on observability events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardrailVerdict {
    Success,
    SuccessWithRewrite,
    Failure,
    Fatal,
}

impl From<&GuardrailResult> for GuardrailVerdict {
    fn from(result: &GuardrailResult) -> Self {
        match result {
            GuardrailResult::Success => Self::Success,
            GuardrailResult::SuccessWith { .. } => Self::SuccessWithRewrite,
            GuardrailResult::Failure(_) => Self::Failure,
            GuardrailResult::Fatal(_) => Self::Fatal,
        }
    }
}
