//! Retrieved-context types supplied by an external retrieval collaborator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One retrieved content item attached to a turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedContent {
    pub text: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl RetrievedContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: HashMap::new(),
            score: None,
        }
    }
}

/// The ordered retrieval result for one turn. Consumed read-only.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RetrievalResult {
    pub items: Vec<RetrievedContent>,
}

impl RetrievalResult {
    pub fn new(items: Vec<RetrievedContent>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
