//! Reconciliation state.
//!
//! Pure data: every transition takes the current state by value and returns
//! the next one with the view already re-derived. The store owns the only
//! instance and swaps it under its lock.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use openexam_core::models::{FileRecord, PendingFile};
use tokio::time::Instant;

use crate::tombstones::Tombstones;

#[derive(Debug, Clone)]
pub struct SyncState {
    server: Vec<FileRecord>,
    placeholders: Vec<FileRecord>,
    tombstones: Tombstones,
    view: Vec<FileRecord>,
    applied_sequence: u64,
}

impl SyncState {
    pub fn new(tombstone_grace: Duration) -> Self {
        Self {
            server: Vec::new(),
            placeholders: Vec::new(),
            tombstones: Tombstones::new(tombstone_grace),
            view: Vec::new(),
            applied_sequence: 0,
        }
    }

    /// Placeholders first, then server records; no duplicate keys.
    pub fn view(&self) -> &[FileRecord] {
        &self.view
    }

    pub fn placeholders(&self) -> &[FileRecord] {
        &self.placeholders
    }

    pub fn tombstones(&self) -> &Tombstones {
        &self.tombstones
    }

    pub fn applied_sequence(&self) -> u64 {
        self.applied_sequence
    }

    /// Whether a response tagged `sequence` is newer than everything applied so far.
    pub fn accepts(&self, sequence: u64) -> bool {
        sequence > self.applied_sequence
    }

    /// Apply a full server listing.
    ///
    /// Expired tombstones are purged first. Placeholders whose key the server
    /// now reports are dropped; the rest stay in front of the server records.
    pub fn with_server_snapshot(
        mut self,
        records: Vec<FileRecord>,
        sequence: u64,
        now: Instant,
    ) -> Self {
        self.tombstones.purge_expired(now);
        self.applied_sequence = self.applied_sequence.max(sequence);
        self.server = records;

        let confirmed: HashSet<&str> = self
            .server
            .iter()
            .filter(|r| !self.tombstones.is_live(&r.key, now))
            .map(|r| r.key.as_str())
            .collect();
        let before = self.placeholders.len();
        self.placeholders
            .retain(|p| !confirmed.contains(p.key.as_str()));
        let superseded = before - self.placeholders.len();
        if superseded > 0 {
            tracing::debug!(superseded, "Placeholders confirmed by server");
        }

        self.rederive(now);
        self
    }

    /// Drop every placeholder and take `records` as the new server truth.
    pub fn with_replaced(mut self, records: Vec<FileRecord>, sequence: u64, now: Instant) -> Self {
        self.tombstones.purge_expired(now);
        self.applied_sequence = self.applied_sequence.max(sequence);
        self.server = records;
        self.placeholders.clear();
        self.rederive(now);
        self
    }

    /// Prepend placeholders for freshly uploaded or generated files.
    ///
    /// Returns the placeholders that were actually added; keys already pending
    /// are not duplicated.
    pub fn with_placeholders(
        mut self,
        pending: &[PendingFile],
        created_at: DateTime<Utc>,
        now: Instant,
    ) -> (Self, Vec<FileRecord>) {
        let mut known: HashSet<String> =
            self.placeholders.iter().map(|p| p.key.clone()).collect();
        let added: Vec<FileRecord> = pending
            .iter()
            .filter(|p| known.insert(p.key.clone()))
            .map(|p| FileRecord::placeholder(p, created_at))
            .collect();

        let mut placeholders = added.clone();
        placeholders.append(&mut self.placeholders);
        self.placeholders = placeholders;

        self.rederive(now);
        (self, added)
    }

    /// Hide `key` locally and tombstone it.
    ///
    /// Returns the removed placeholder and server record, if any, so a failed
    /// delete can be rolled back.
    pub fn without_key(mut self, key: &str, now: Instant) -> (Self, Removed) {
        let placeholder = take_by_key(&mut self.placeholders, key);
        let server = take_by_key(&mut self.server, key);
        self.tombstones.record(key, now);
        self.rederive(now);
        (
            self,
            Removed {
                key: key.to_string(),
                placeholder,
                server,
            },
        )
    }

    /// Undo [`SyncState::without_key`]: lift the tombstone and restore records.
    ///
    /// A server record is only restored if no newer snapshot already
    /// reintroduced the key.
    pub fn with_restored(mut self, removed: Removed, now: Instant) -> Self {
        self.tombstones.remove(&removed.key);
        if let Some(placeholder) = removed.placeholder {
            if !self.placeholders.iter().any(|p| p.key == placeholder.key) {
                self.placeholders.insert(0, placeholder);
            }
        }
        if let Some(record) = removed.server {
            if !self.server.iter().any(|r| r.key == record.key) {
                let at = self
                    .server
                    .iter()
                    .position(|r| r.created_at < record.created_at)
                    .unwrap_or(self.server.len());
                self.server.insert(at, record);
            }
        }
        self.rederive(now);
        self
    }

    /// Recompute the view from placeholders, server records and tombstones.
    pub fn rederive(&mut self, now: Instant) {
        let mut server_keys = HashSet::new();
        let server: Vec<FileRecord> = self
            .server
            .iter()
            .filter(|r| !self.tombstones.is_live(&r.key, now))
            .filter(|r| server_keys.insert(r.key.clone()))
            .cloned()
            .collect();

        let mut placeholder_keys = HashSet::new();
        let mut view: Vec<FileRecord> = self
            .placeholders
            .iter()
            .filter(|p| !self.tombstones.is_live(&p.key, now))
            .filter(|p| !server_keys.contains(&p.key))
            .filter(|p| placeholder_keys.insert(p.key.clone()))
            .cloned()
            .collect();

        view.extend(server);
        self.view = view;
    }
}

/// Records taken out of the state by an optimistic delete.
#[derive(Debug, Clone, PartialEq)]
pub struct Removed {
    pub key: String,
    pub placeholder: Option<FileRecord>,
    pub server: Option<FileRecord>,
}

impl Removed {
    /// The record that was visible for this key, preferring the server copy.
    pub fn record(&self) -> Option<&FileRecord> {
        self.server.as_ref().or(self.placeholder.as_ref())
    }
}

fn take_by_key(records: &mut Vec<FileRecord>, key: &str) -> Option<FileRecord> {
    let mut taken = None;
    records.retain(|r| {
        if r.key == key {
            if taken.is_none() {
                taken = Some(r.clone());
            }
            false
        } else {
            true
        }
    });
    taken
}

/// Sort newest first. Stable, so equal timestamps keep server order.
pub fn sort_newest_first(records: &mut [FileRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
