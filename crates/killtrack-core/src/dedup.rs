//! Bounded line de-duplication.
//!
//! The host redelivers every visible chat line on each poll, so each line's
//! fingerprint is remembered until capacity pressure evicts it. Eviction is
//! FIFO: when the cache grows past `capacity`, only the `retain` most recently
//! inserted fingerprints survive.

use std::collections::{HashSet, VecDeque};
use std::hash::{Hash, Hasher};

/// Default capacity ceiling.
pub const DEFAULT_CAPACITY: usize = 2000;
/// Default number of fingerprints kept after a trim.
pub const DEFAULT_RETAIN: usize = 1200;

/// Opaque identifier of a chat line.
pub type LineId = u64;

/// Compute a line fingerprint over the full text and its length (not cryptographic).
pub fn line_id(text: &str) -> LineId {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    text.hash(&mut hasher);
    text.len().hash(&mut hasher);
    hasher.finish()
}

// ─── LineDeduper ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LineDeduper {
    /// Fingerprints in insertion order (oldest at the front).
    order: VecDeque<LineId>,
    members: HashSet<LineId>,
    capacity: usize,
    retain: usize,
}

impl Default for LineDeduper {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_RETAIN)
    }
}

impl LineDeduper {
    /// `retain` is clamped to `capacity`.
    pub fn new(capacity: usize, retain: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity.saturating_add(1)),
            members: HashSet::with_capacity(capacity.saturating_add(1)),
            capacity,
            retain: retain.min(capacity),
        }
    }

    /// Returns `true` if the line was already seen. Marks it as seen either way.
    pub fn seen(&mut self, text: &str) -> bool {
        self.seen_id(line_id(text))
    }

    /// Same as [`seen`](Self::seen) for a precomputed fingerprint.
    pub fn seen_id(&mut self, id: LineId) -> bool {
        if self.members.contains(&id) {
            return true;
        }
        self.members.insert(id);
        self.order.push_back(id);
        if self.order.len() > self.capacity {
            self.trim();
        }
        false
    }

    /// Non-mutating membership check.
    pub fn contains(&self, text: &str) -> bool {
        self.members.contains(&line_id(text))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    fn trim(&mut self) {
        let excess = self.order.len().saturating_sub(self.retain);
        for id in self.order.drain(..excess) {
            self.members.remove(&id);
        }
        tracing::debug!(
            evicted = excess,
            retained = self.order.len(),
            "dedup cache trimmed"
        );
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
