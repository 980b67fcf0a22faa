//! Processed-listing tracker.
//!
//! Feed pages overlap between polls, so the same auction is fetched many
//! times while it stays listed. The tracker remembers every auction id that
//! has been evaluated so it is processed once per process lifetime.
//!
//! By default the set only grows. Growth per cycle is bounded by the
//! recency window (only fresh listings get marked), but a long-running
//! process accumulates every id it ever saw. When a retention period is
//! configured, `evict_before` drops ids created before the cutoff.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

/// Set of auction ids already evaluated.
#[derive(Debug, Default)]
pub struct DedupTracker {
    /// id -> listing creation time, kept for windowed eviction.
    seen: HashMap<String, DateTime<Utc>>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` was already evaluated.
    pub fn seen(&self, id: &str) -> bool {
        self.seen.contains_key(id)
    }

    /// Record `id` as evaluated. Returns `false` if it was already present,
    /// in which case the stored creation time is left unchanged.
    pub fn mark_seen(&mut self, id: &str, created_at: DateTime<Utc>) -> bool {
        if self.seen.contains_key(id) {
            return false;
        }
        self.seen.insert(id.to_string(), created_at);
        true
    }

    /// Drop every id whose listing was created before `cutoff`. Returns the
    /// number of ids removed.
    ///
    /// Only safe when `cutoff` is older than the recency window: an evicted
    /// id must never be able to pass the recency gate again.
    pub fn evict_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.seen.len();
        self.seen.retain(|_, created| *created >= cutoff);
        let evicted = before - self.seen.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.seen.len(), "Evicted old listing ids");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
