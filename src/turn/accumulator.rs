//! Reconstructs logical tool calls from interleaved stream fragments.

use std::collections::BTreeMap;

use crate::error::{Result, TurnstileError};
use crate::types::{ToolCallFragment, ToolExecutionRequest};

/// Accumulates tool-call fragments by index.
///
/// Fragments for different indices may interleave; fragments sharing an
/// index arrive in fragment order and are concatenated.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    pending: BTreeMap<usize, PendingCall>,
}

#[derive(Debug, Default)]
struct PendingCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

impl ToolCallAccumulator {
    pub fn absorb(&mut self, fragment: ToolCallFragment) {
        let entry = self.pending.entry(fragment.index).or_default();
        if fragment.id.is_some() {
            entry.id = fragment.id;
        }
        if fragment.name.is_some() {
            entry.name = fragment.name;
        }
        entry.arguments.push_str(&fragment.arguments_delta);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Produce the reconstructed requests in index order.
    ///
    /// Every accumulated call must have seen a name by the time the
    /// stream completes.
    pub fn finish(self) -> Result<Vec<ToolExecutionRequest>> {
        self.pending
            .into_iter()
            .map(|(index, call)| {
                let name = call.name.ok_or_else(|| {
                    TurnstileError::Stream(format!(
                        "tool call at index {index} completed without a name"
                    ))
                })?;
                Ok(ToolExecutionRequest::new(call.id, name, call.arguments))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(
        index: usize,
        id: Option<&str>,
        name: Option<&str>,
        delta: &str,
    ) -> ToolCallFragment {
        ToolCallFragment {
            index,
            id: id.map(str::to_string),
            name: name.map(str::to_string),
            arguments_delta: delta.to_string(),
        }
    }

    #[test]
    fn interleaved_indices_reassemble_in_fragment_order() {
        let mut acc = ToolCallAccumulator::default();
        acc.absorb(fragment(0, Some("call-a"), Some("lookup"), r#"{"q":"#));
        acc.absorb(fragment(1, Some("call-b"), Some("fetch"), r#"{"url":"#));
        acc.absorb(fragment(0, None, None, r#""rust"}"#));
        acc.absorb(fragment(1, None, None, r#""x"}"#));

        let calls = acc.finish().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "lookup");
        assert_eq!(calls[0].arguments, r#"{"q":"rust"}"#);
        assert_eq!(calls[1].id.as_deref(), Some("call-b"));
        assert_eq!(calls[1].arguments, r#"{"url":"x"}"#);
    }

    #[test]
    fn nameless_call_is_a_stream_error() {
        let mut acc = ToolCallAccumulator::default();
        acc.absorb(fragment(0, Some("call-a"), None, "{}"));
        assert!(matches!(acc.finish(), Err(TurnstileError::Stream(_))));
    }
}
