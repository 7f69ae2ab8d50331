//! Deletion tombstones.
//!
//! A tombstone hides a deleted key from server snapshots for a grace window,
//! because the listing service may still report the file for a while after
//! the delete was issued. Expiry is the only way a tombstone goes away.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Tombstones {
    grace: Duration,
    entries: HashMap<String, Instant>,
}

impl Tombstones {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            entries: HashMap::new(),
        }
    }

    /// Record (or refresh) a tombstone for `key`.
    pub fn record(&mut self, key: &str, now: Instant) {
        self.entries.insert(key.to_string(), now);
    }

    /// Whether `key` is hidden at `now`.
    pub fn is_live(&self, key: &str, now: Instant) -> bool {
        self.entries
            .get(key)
            .is_some_and(|deleted_at| !self.is_expired(*deleted_at, now))
    }

    /// Drop tombstones older than the grace window. Returns how many were removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let grace = self.grace;
        self.entries
            .retain(|_, deleted_at| now.saturating_duration_since(*deleted_at) <= grace);
        before - self.entries.len()
    }

    pub(crate) fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, deleted_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(deleted_at) > self.grace
    }
}
