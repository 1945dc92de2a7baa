//! Typed access to tool arguments.

use serde::de::DeserializeOwned;

use crate::error::{Result, TurnstileError};

/// Parsed tool arguments with typed accessors.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Parse from the raw argument string a model produced.
    ///
    /// An empty string binds to an empty object; anything else must be
    /// valid JSON.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::new(serde_json::json!({})));
        }
        let value = serde_json::from_str(raw)?;
        Ok(Self::new(value))
    }

    /// The raw JSON value.
    pub fn value(&self) -> &serde_json::Value {
        &self.value
    }

    /// Deserialize the arguments into a typed struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.value.clone())?)
    }

    /// Get a required string argument.
    pub fn get_str(&self, name: &str) -> Result<&str> {
        self.value[name]
            .as_str()
            .ok_or_else(|| missing(name, "string"))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, name: &str) -> Option<&str> {
        self.value[name].as_str()
    }

    /// Get a required integer argument.
    pub fn get_i64(&self, name: &str) -> Result<i64> {
        self.value[name]
            .as_i64()
            .ok_or_else(|| missing(name, "integer"))
    }

    /// Get a required float argument.
    pub fn get_f64(&self, name: &str) -> Result<f64> {
        self.value[name]
            .as_f64()
            .ok_or_else(|| missing(name, "number"))
    }

    /// Get a required boolean argument.
    pub fn get_bool(&self, name: &str) -> Result<bool> {
        self.value[name]
            .as_bool()
            .ok_or_else(|| missing(name, "boolean"))
    }
}

fn missing(name: &str, kind: &str) -> TurnstileError {
    TurnstileError::InvalidArgument(format!("missing or invalid {kind} argument '{name}'"))
}
