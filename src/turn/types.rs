//! Turn lifecycle types.

use chrono::{DateTime, Utc};

use crate::types::ChatResponse;

/// Turn lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Completed,
    Failed,
    Cancelled,
}

/// Terminal outcome of one turn.
///
/// Cancellation is a distinct outcome, not an error.
#[derive(Debug)]
pub struct TurnResult {
    pub status: TurnStatus,
    pub response: Option<ChatResponse>,
    pub error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl TurnResult {
    pub fn completed(response: ChatResponse) -> Self {
        Self {
            status: TurnStatus::Completed,
            response: Some(response),
            error: None,
            finished_at: Utc::now(),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            status: TurnStatus::Cancelled,
            response: None,
            error: None,
            finished_at: Utc::now(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: TurnStatus::Failed,
            response: None,
            error: Some(error.into()),
            finished_at: Utc::now(),
        }
    }
}
