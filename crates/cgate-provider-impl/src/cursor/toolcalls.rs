//! Tool-call reassembly tracker: keeps a map `id -> {name, accumulatedArgs,
//! index, isLast}` so a missing `isLast` on the wire doesn't leave a tool
//! call dangling (finalised defensively once the stream ends).

use std::collections::HashMap;

use cgate_provider_core::StreamEvent;

struct ToolCallState {
    name: Option<String>,
    accumulated: String,
    index: usize,
    is_last: bool,
}

#[derive(Default)]
pub struct ToolCallTracker {
    calls: HashMap<String, ToolCallState>,
    next_index: usize,
}

impl ToolCallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one chunk and returns the event to forward downstream.
    pub fn observe(
        &mut self,
        id: String,
        name: Option<String>,
        arguments_fragment: String,
        is_last: bool,
    ) -> StreamEvent {
        let entry = self.calls.entry(id.clone()).or_insert_with(|| {
            let index = self.next_index;
            self.next_index += 1;
            ToolCallState {
                name: None,
                accumulated: String::new(),
                index,
                is_last: false,
            }
        });
        if entry.name.is_none() {
            entry.name = name.clone();
        }
        entry.accumulated.push_str(&arguments_fragment);
        entry.is_last = is_last;

        StreamEvent::ToolCallDelta {
            id,
            name,
            arguments_fragment,
            is_last,
        }
    }

    /// The full argument string accumulated so far for `id`, for tests and
    /// non-streaming assembly.
    pub fn accumulated_arguments(&self, id: &str) -> Option<&str> {
        self.calls.get(id).map(|s| s.accumulated.as_str())
    }

    /// Emits a synthetic final event for every tool call the upstream never
    /// marked `isLast` on, once the stream has ended.
    pub fn finalize_remaining(&mut self) -> Vec<StreamEvent> {
        self.calls
            .iter_mut()
            .filter(|(_, state)| !state.is_last)
            .map(|(id, state)| {
                state.is_last = true;
                StreamEvent::ToolCallDelta {
                    id: id.clone(),
                    name: None,
                    arguments_fragment: String::new(),
                    is_last: true,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_chunks_for_the_same_id_in_arrival_order() {
        let mut tracker = ToolCallTracker::new();
        tracker.observe("call-1".into(), Some("search".into()), "{\"q\":".into(), false);
        tracker.observe("call-1".into(), None, "\"rust\"}".into(), true);
        assert_eq!(tracker.accumulated_arguments("call-1"), Some("{\"q\":\"rust\"}"));
    }

    #[test]
    fn assigns_increasing_indices_to_new_ids() {
        let mut tracker = ToolCallTracker::new();
        tracker.observe("a".into(), Some("f1".into()), "".into(), false);
        tracker.observe("b".into(), Some("f2".into()), "".into(), false);
        assert_eq!(tracker.calls.get("a").unwrap().index, 0);
        assert_eq!(tracker.calls.get("b").unwrap().index, 1);
    }

    #[test]
    fn finalizes_entries_missing_is_last_at_stream_end() {
        let mut tracker = ToolCallTracker::new();
        tracker.observe("a".into(), Some("f1".into()), "partial".into(), false);
        let remaining = tracker.finalize_remaining();
        assert_eq!(remaining.len(), 1);
        assert!(matches!(remaining[0], StreamEvent::ToolCallDelta { is_last: true, .. }));
        // A second call finds nothing left to finalise.
        assert!(tracker.finalize_remaining().is_empty());
    }
}
