//! Chat memory contract and the disposable per-turn buffer.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::context::MemorySlot;
use crate::types::ChatMessage;

/// Persistent conversation memory, owned by a collaborator.
///
/// The orchestrator never inspects memory internals; it only reads and
/// appends through this contract.
pub trait ChatMemory: Send + Sync {
    fn messages(&self, slot: &MemorySlot) -> Vec<ChatMessage>;
    fn append(&self, slot: &MemorySlot, messages: &[ChatMessage]);
}

/// Simple in-process memory keyed by slot.
#[derive(Default)]
pub struct InMemoryChatMemory {
    slots: RwLock<HashMap<MemorySlot, Vec<ChatMessage>>>,
}

impl InMemoryChatMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChatMemory for InMemoryChatMemory {
    fn messages(&self, slot: &MemorySlot) -> Vec<ChatMessage> {
        self.slots
            .read()
            .expect("memory lock")
            .get(slot)
            .cloned()
            .unwrap_or_default()
    }

    fn append(&self, slot: &MemorySlot, messages: &[ChatMessage]) {
        self.slots
            .write()
            .expect("memory lock")
            .entry(slot.clone())
            .or_default()
            .extend_from_slice(messages);
    }
}

/// The conversation backing one turn.
///
/// With persistent memory configured, reads and writes go through the
/// [`ChatMemory`] contract. Otherwise a disposable buffer exclusively
/// owned by the turn holds exactly the outgoing messages and is dropped
/// with it.
pub(crate) enum Conversation {
    Persistent {
        memory: Arc<dyn ChatMemory>,
        slot: MemorySlot,
    },
    Disposable(Vec<ChatMessage>),
}

impl Conversation {
    pub(crate) fn for_turn(memory: Option<Arc<dyn ChatMemory>>, slot: MemorySlot) -> Self {
        match memory {
            Some(memory) => Self::Persistent { memory, slot },
            None => Self::Disposable(Vec::new()),
        }
    }

    pub(crate) fn messages(&self) -> Vec<ChatMessage> {
        match self {
            Self::Persistent { memory, slot } => memory.messages(slot),
            Self::Disposable(buffer) => buffer.clone(),
        }
    }

    pub(crate) fn append(&mut self, messages: &[ChatMessage]) {
        match self {
            Self::Persistent { memory, slot } => memory.append(slot, messages),
            Self::Disposable(buffer) => buffer.extend_from_slice(messages),
        }
    }
}
