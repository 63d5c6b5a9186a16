use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use webagent_core_types::{EpochMs, SessionId};

/// Immutable record of one captured frame. Owned by the [`FrameRing`]; once
/// evicted the in-memory reference is gone even though the on-disk artifact may
/// still exist (janitor-reclaimable — this crate never deletes frame files).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrameRef {
    /// `{session_id}-{epoch_ms}-{seq}`, seq monotonic per session.
    pub id: String,
    pub session_id: String,
    pub timestamp: EpochMs,
    pub width: u32,
    pub height: u32,
    pub mime: String,
    pub checksum: String,
    pub storage_path: String,
    pub metadata: FrameMetadata,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FrameMetadata {
    pub raw_byte_length: usize,
    pub processing_ms: u64,
    pub source_scale: f64,
}

impl FrameRef {
    pub fn build_id(session_id: &SessionId, epoch_ms: EpochMs, seq: u64) -> String {
        format!("{}-{}-{}", session_id.0, epoch_ms, seq)
    }
}

/// Fixed-capacity FIFO with drop-oldest eviction. `dropped` is monotonically
/// non-decreasing for the lifetime of the ring — see invariant 2 in the spec.
pub struct FrameRing {
    capacity: usize,
    items: VecDeque<FrameRef>,
    dropped: u64,
}

impl FrameRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            items: VecDeque::with_capacity(capacity.max(1)),
            dropped: 0,
        }
    }

    /// Push a frame, evicting the oldest if at capacity. Returns `true` if an
    /// eviction occurred.
    pub fn push(&mut self, frame: FrameRef) -> bool {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front();
            self.dropped += 1;
            true
        } else {
            false
        };
        self.items.push_back(frame);
        evicted
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Snapshot copy of the current contents, oldest first. Callers never see a
    /// torn ring because this clones under whatever lock the caller holds.
    pub fn snapshot(&self) -> Vec<FrameRef> {
        self.items.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<FrameRef> {
        self.items.back().cloned()
    }

    /// Last `n` entries, oldest first, `n` clamped to at least 1.
    pub fn last_n(&self, n: usize) -> Vec<FrameRef> {
        let n = n.max(1);
        let skip = self.items.len().saturating_sub(n);
        self.items.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(id: &str) -> FrameRef {
        FrameRef {
            id: id.to_string(),
            session_id: "s1".to_string(),
            timestamp: 0,
            width: 100,
            height: 100,
            mime: "image/jpeg".to_string(),
            checksum: "abc".to_string(),
            storage_path: format!("/tmp/{id}.jpg"),
            metadata: FrameMetadata::default(),
        }
    }

    #[test]
    fn eviction_tracks_dropped_and_tail() {
        // S5 — ring eviction: push N = capacity + 3, depth = capacity, dropped = 3.
        let capacity = 5;
        let mut ring = FrameRing::new(capacity);
        for i in 0..capacity + 3 {
            ring.push(frame(&format!("f{i}")));
        }
        assert_eq!(ring.depth(), capacity);
        assert_eq!(ring.dropped(), 3);
        assert_eq!(ring.latest().unwrap().id, format!("f{}", capacity + 2));
    }

    #[test]
    fn dropped_is_monotonic() {
        let mut ring = FrameRing::new(2);
        ring.push(frame("a"));
        ring.push(frame("b"));
        assert_eq!(ring.dropped(), 0);
        ring.push(frame("c"));
        assert_eq!(ring.dropped(), 1);
        ring.push(frame("d"));
        assert_eq!(ring.dropped(), 2);
    }
}
