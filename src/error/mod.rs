//! Error types for Turnstile.

pub mod mapper;

pub use mapper::{map_boxed, map_failure, root_cause};

use thiserror::Error;

/// Primary error type for all Turnstile operations.
#[derive(Error, Debug)]
pub enum TurnstileError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Input guardrail rejected the message: {message}")]
    InputGuardrail {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Output guardrail rejected the response: {message}")]
    OutputGuardrail {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Guardrail '{guardrail}' failed to execute")]
    GuardrailExecution {
        guardrail: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Malformed arguments for tool '{tool_name}': {message}")]
    ToolArguments { tool_name: String, message: String },

    #[error("Tool '{tool_name}' failed: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Tool loop exceeded {limit} sequential rounds")]
    ToolRoundsExceeded { limit: usize },

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal server error (status {status}): {message}")]
    InternalServer { status: u16, message: String },

    #[error("Model server unreachable: {0}")]
    ModelUnreachable(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Guardrail,
    Tool,
    Authentication,
    RateLimit,
    Timeout,
    InvalidRequest,
    Server,
    Network,
    Serialization,
    Unknown,
}

impl TurnstileError {
    /// Create an API error without a source.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            source: None,
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::InvalidArgument(_) | Self::InvalidState(_) => {
                ErrorCategory::Configuration
            }
            Self::InputGuardrail { .. }
            | Self::OutputGuardrail { .. }
            | Self::GuardrailExecution { .. } => ErrorCategory::Guardrail,
            Self::ToolArguments { .. }
            | Self::ToolExecution { .. }
            | Self::ToolRoundsExceeded { .. } => ErrorCategory::Tool,
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited(_) => ErrorCategory::RateLimit,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::ModelNotFound(_) | Self::InvalidRequest(_) => ErrorCategory::InvalidRequest,
            Self::InternalServer { .. } => ErrorCategory::Server,
            Self::ModelUnreachable(_) | Self::Network(_) | Self::Stream(_) => {
                ErrorCategory::Network
            }
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                408 => ErrorCategory::Timeout,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::InvalidRequest,
            },
            _ => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Timeout
                | ErrorCategory::Server
                | ErrorCategory::Network
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TurnstileError>;
