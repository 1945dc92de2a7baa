//! Chat response types and token usage.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::message::{ChatMessage, ToolExecutionRequest};

/// A complete response from one model round-trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub message: ChatMessage,
    #[serde(default)]
    pub metadata: ResponseMetadata,
}

impl ChatResponse {
    pub fn new(message: ChatMessage, metadata: ResponseMetadata) -> Self {
        Self { message, metadata }
    }

    /// Defensive default returned where a response is required but none
    /// arrived. Never hand callers a "null" response.
    pub fn empty() -> Self {
        Self {
            message: ChatMessage::assistant(""),
            metadata: ResponseMetadata::default(),
        }
    }

    /// The assistant text of this response.
    pub fn text(&self) -> String {
        self.message.text()
    }

    /// Tool execution requests carried directly in the message.
    pub fn tool_calls(&self) -> Vec<&ToolExecutionRequest> {
        self.message.tool_calls()
    }

    /// Rebuild this response with replaced assistant text (guardrail
    /// rewrites).
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.message = self.message.with_text(text);
        self
    }
}

/// Metadata attached to a response.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResponseMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default)]
    pub usage: TokenUsage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// Token usage for one round-trip.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Merge another usage into this one (accumulate across rounds).
    pub fn merge(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Why generation finished.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Error,
}
