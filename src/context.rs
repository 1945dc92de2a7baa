//! Invocation correlation metadata.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one logical call into the turn orchestrator.
///
/// Threaded through every event and guardrail request so observability
/// output can be correlated back to the originating call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvocationContext {
    /// The service interface this call belongs to.
    pub interface_name: String,
    /// The method on that interface.
    pub method_name: String,
    /// Per-call correlation id.
    pub invocation_id: Uuid,
    /// Memory slot this call reads and writes.
    pub memory_slot: MemorySlot,
}

impl InvocationContext {
    pub fn new(interface_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            interface_name: interface_name.into(),
            method_name: method_name.into(),
            invocation_id: Uuid::new_v4(),
            memory_slot: MemorySlot::default(),
        }
    }

    pub fn with_memory_slot(mut self, slot: impl Into<MemorySlot>) -> Self {
        self.memory_slot = slot.into();
        self
    }
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::new("anonymous", "chat")
    }
}

impl fmt::Display for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}#{}",
            self.interface_name, self.method_name, self.invocation_id
        )
    }
}

/// Identifies one conversation's slot in chat memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MemorySlot(pub String);

impl Default for MemorySlot {
    fn default() -> Self {
        Self("default".to_string())
    }
}

impl From<&str> for MemorySlot {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MemorySlot {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for MemorySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
