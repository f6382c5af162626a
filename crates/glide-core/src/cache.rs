//! Last-applied payload memo, one entry per live node.

use std::collections::HashMap;

use crate::dom::NodeId;
use crate::synth::TransformPayload;

/// Outcome of offering a payload to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// First observation or different from the last write: apply it.
    Changed,
    /// Identical to what the node already carries: skip the write.
    Unchanged,
}

/// Per-node memo of the last written payload.
///
/// Payloads are compared structurally; their ordered map makes this
/// equivalent to comparing deterministic serializations. No eviction:
/// the owner drops the whole cache on rescan.
#[derive(Debug, Default)]
pub struct ChangeCache {
    entries: HashMap<NodeId, TransformPayload>,
}

impl ChangeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `payload` for `node` if it differs from the stored one.
    pub fn offer(&mut self, node: NodeId, payload: &TransformPayload) -> CacheDecision {
        match self.entries.get(&node) {
            Some(previous) if previous == payload => CacheDecision::Unchanged,
            _ => {
                self.entries.insert(node, payload.clone());
                CacheDecision::Changed
            }
        }
    }

    pub fn last_applied(&self, node: NodeId) -> Option<&TransformPayload> {
        self.entries.get(&node)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
