//! Streaming event types.

use serde::{Deserialize, Serialize};

use super::message::ToolExecutionRequest;
use super::response::ChatResponse;

/// One incremental unit of a streamed response.
///
/// `Complete` is terminal; after it (or after an error item) no further
/// events are delivered for the stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental assistant text.
    PartialText { text: String },
    /// Incremental reasoning ("thinking") text.
    PartialThinking { text: String },
    /// A fragment of a tool call still being built.
    PartialToolCall(ToolCallFragment),
    /// A tool call the transport has fully assembled.
    CompleteToolCall(ToolExecutionRequest),
    /// The response is complete.
    Complete(ChatResponse),
}

/// A fragment of one logical tool call.
///
/// `index` is 0-based and stable across all fragments of the same call;
/// fragments for different indices may interleave.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallFragment {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments_delta: String,
}
