//! Chat request types.

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::message::ChatMessage;
use crate::tools::ToolSpecification;

/// One outgoing round-trip to a model.
///
/// Immutable once built; the per-turn request transform produces a new
/// request rather than mutating this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub parameters: ChatRequestParameters,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>, parameters: ChatRequestParameters) -> Self {
        Self {
            messages,
            parameters,
        }
    }
}

/// Parameters controlling one chat round-trip.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, Default)]
pub struct ChatRequestParameters {
    pub model_name: Option<String>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<u32>,
    pub stop_sequences: Option<Vec<String>>,
    pub tools: Option<Vec<ToolSpecification>>,
    pub tool_choice: Option<ToolChoice>,
    pub response_format: Option<ResponseFormat>,
}

/// How the model is allowed to pick tools.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolChoice {
    Auto,
    Required,
    None,
}

/// Requested response format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
    JsonSchema {
        schema: serde_json::Value,
        name: String,
    },
}
