//! Reconciling file store.
//!
//! Holds the best-known file list for one observer and keeps it correct under
//! optimistic local actions, full refreshes and bus notifications. Server
//! state is only ever pulled; refresh responses are tagged with a sequence
//! number so a slow response can never overwrite a newer one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use openexam_core::constants::FILES_CHANGED_CHANNEL;
use openexam_core::models::{FileRecord, PendingFile, StorageKey};
use openexam_core::{
    ClientConfig, ClientError, ClientResult, ErrorMetadata, FileDeletion, FileListing, LogLevel,
    RecoveryPolicy,
};
use serde::Serialize;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::time::Instant;

use crate::bus::{EventBus, Subscription};
use crate::debounce::Debouncer;
use crate::state::{sort_newest_first, SyncState};

const NOTICE_CAPACITY: usize = 32;

/// Snapshot handed to observers.
pub type FileView = Arc<Vec<FileRecord>>;

/// The backend surface the store needs.
pub trait StoreBackend: FileListing + FileDeletion {}

impl<T> StoreBackend for T where T: FileListing + FileDeletion {}

/// Tuning for one store instance.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub request_timeout: Duration,
    pub refresh_debounce: Duration,
    pub tombstone_grace: Duration,
    pub delete_recovery: RecoveryPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for StoreConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            request_timeout: config.request_timeout,
            refresh_debounce: config.refresh_debounce,
            tombstone_grace: config.tombstone_grace,
            delete_recovery: config.delete_recovery,
        }
    }
}

/// Transient user-facing notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub operation: &'static str,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

impl Notice {
    pub fn from_error(operation: &'static str, err: &ClientError) -> Self {
        Self {
            level: NoticeLevel::Error,
            operation,
            code: err.error_code(),
            message: err.client_message(),
        }
    }

    pub fn info(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            operation,
            code: "OK",
            message: message.into(),
        }
    }
}

/// How a refresh call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The response became the new server snapshot.
    Applied,
    /// A newer response had already been applied; this one was dropped.
    Stale,
    /// The store shut down while the request was in flight.
    Discarded,
}

pub struct FileStore {
    backend: Arc<dyn StoreBackend>,
    config: StoreConfig,
    state: RwLock<SyncState>,
    sequence: AtomicU64,
    view_tx: watch::Sender<FileView>,
    notice_tx: broadcast::Sender<Notice>,
    debouncer: Debouncer,
    shut_down: AtomicBool,
}

impl FileStore {
    /// Create a store. Must be called inside a tokio runtime.
    pub fn new(backend: Arc<dyn StoreBackend>, config: StoreConfig) -> Arc<Self> {
        let (view_tx, _) = watch::channel(Arc::new(Vec::new()));
        let (notice_tx, _) = broadcast::channel(NOTICE_CAPACITY);

        Arc::new_cyclic(|weak: &Weak<FileStore>| {
            let weak = weak.clone();
            let debouncer = Debouncer::spawn(config.refresh_debounce, move || {
                let weak = weak.clone();
                async move {
                    let Some(store) = weak.upgrade() else {
                        return;
                    };
                    if store.is_shut_down() {
                        return;
                    }
                    // Failures are already logged and surfaced as notices.
                    let _ = store.refresh().await;
                }
            });

            FileStore {
                backend,
                state: RwLock::new(SyncState::new(config.tombstone_grace)),
                config,
                sequence: AtomicU64::new(0),
                view_tx,
                notice_tx,
                debouncer,
                shut_down: AtomicBool::new(false),
            }
        })
    }

    /// Current view: placeholders first, then server records newest first.
    pub fn view(&self) -> FileView {
        self.view_tx.borrow().clone()
    }

    /// Receiver that observes every published view.
    pub fn subscribe_view(&self) -> watch::Receiver<FileView> {
        self.view_tx.subscribe()
    }

    /// Receiver for transient notices (errors and confirmations).
    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notice_tx.subscribe()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Fetch the full file set and merge it into the view.
    ///
    /// On failure the previous view is left untouched.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self) -> ClientResult<RefreshOutcome> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        let mut records = match tokio::time::timeout(
            self.config.request_timeout,
            self.backend.list_files(),
        )
        .await
        {
            Ok(Ok(records)) => records,
            Ok(Err(err)) => return Err(self.report_failure("refresh files", err)),
            Err(_) => {
                let err = ClientError::timed_out("refresh files", self.config.request_timeout);
                return Err(self.report_failure("refresh files", err));
            }
        };

        if self.is_shut_down() {
            tracing::debug!(sequence, "Store shut down, dropping refresh response");
            return Ok(RefreshOutcome::Discarded);
        }

        sort_newest_first(&mut records);
        let count = records.len();

        let view = {
            let mut state = self.state.write().await;
            if !state.accepts(sequence) {
                tracing::debug!(
                    sequence,
                    applied = state.applied_sequence(),
                    "Discarding stale refresh response"
                );
                return Ok(RefreshOutcome::Stale);
            }
            let next = state
                .clone()
                .with_server_snapshot(records, sequence, Instant::now());
            *state = next;
            state.view().to_vec()
        };

        tracing::debug!(sequence, count, visible = view.len(), "Applied server snapshot");
        self.publish_view(view);
        Ok(RefreshOutcome::Applied)
    }

    /// Show freshly uploaded or generated files before the server lists them.
    ///
    /// Schedules a debounced refresh. Returns the placeholders added.
    #[tracing::instrument(skip(self, pending), fields(count = pending.len()))]
    pub async fn record_optimistic_add(&self, pending: &[PendingFile]) -> Vec<FileRecord> {
        if pending.is_empty() {
            return Vec::new();
        }

        let (view, added) = {
            let mut state = self.state.write().await;
            let (next, added) =
                state
                    .clone()
                    .with_placeholders(pending, Utc::now(), Instant::now());
            *state = next;
            (state.view().to_vec(), added)
        };

        tracing::info!(added = added.len(), "Recorded optimistic add");
        self.publish_view(view);
        self.request_refresh();
        added
    }

    /// Hide `key` immediately, then delete it on the server.
    ///
    /// On failure the configured delete recovery policy decides whether the
    /// record comes back. Returns the record that was visible for the key.
    #[tracing::instrument(skip(self))]
    pub async fn record_optimistic_delete(&self, key: &str) -> ClientResult<Option<FileRecord>> {
        let known_category = self
            .view()
            .iter()
            .find(|r| r.key == key)
            .and_then(|r| r.category());
        let parsed =
            StorageKey::parse(key).map_err(|err| self.report_failure("delete file", err))?;
        let category = known_category.unwrap_or(parsed.category);

        let (view, removed) = {
            let mut state = self.state.write().await;
            let (next, removed) = state.clone().without_key(key, Instant::now());
            *state = next;
            (state.view().to_vec(), removed)
        };
        self.publish_view(view);

        let result = match tokio::time::timeout(
            self.config.request_timeout,
            self.backend.delete_file(category, &parsed.filename),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ClientError::timed_out(
                "delete file",
                self.config.request_timeout,
            )),
        };

        match result {
            Ok(()) => {
                tracing::info!(key = %key, category = %category, "File deleted");
                self.notify(Notice::info("delete file", "File deleted successfully"));
                Ok(removed.record().cloned())
            }
            Err(err) => {
                if self.config.delete_recovery == RecoveryPolicy::Rollback && !self.is_shut_down() {
                    let view = {
                        let mut state = self.state.write().await;
                        let next = state.clone().with_restored(removed, Instant::now());
                        *state = next;
                        state.view().to_vec()
                    };
                    tracing::debug!(key = %key, "Rolled back optimistic delete");
                    self.publish_view(view);
                }
                Err(self.report_failure("delete file", err))
            }
        }
    }

    /// Drop every placeholder and take `records` as the server truth.
    ///
    /// Used once a generation has been confirmed. Tombstones still apply.
    pub async fn replace_all(&self, mut records: Vec<FileRecord>) {
        if self.is_shut_down() {
            return;
        }
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        sort_newest_first(&mut records);

        let view = {
            let mut state = self.state.write().await;
            let next = state
                .clone()
                .with_replaced(records, sequence, Instant::now());
            *state = next;
            state.view().to_vec()
        };
        tracing::debug!(sequence, visible = view.len(), "Replaced file set");
        self.publish_view(view);
    }

    /// Schedule a debounced refresh.
    pub fn request_refresh(&self) {
        if !self.is_shut_down() {
            self.debouncer.trigger();
        }
    }

    /// Refresh (debounced) on every `filesChanged` event.
    pub async fn attach(self: &Arc<Self>, bus: &EventBus) -> Subscription {
        let weak = Arc::downgrade(self);
        bus.subscribe(FILES_CHANGED_CHANNEL, move |payload| {
            if let Some(store) = weak.upgrade() {
                tracing::debug!(
                    action = ?payload.as_ref().map(|p| p.action),
                    "Files changed, scheduling refresh"
                );
                store.request_refresh();
            }
        })
        .await
    }

    /// Stop scheduling refreshes. In-flight responses are dropped.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.debouncer.cancel();
        tracing::debug!("File store shut down");
    }

    fn publish_view(&self, view: Vec<FileRecord>) {
        if self.is_shut_down() {
            return;
        }
        self.view_tx.send_replace(Arc::new(view));
    }

    /// Emit a transient notice to every notice subscriber.
    pub fn notify(&self, notice: Notice) {
        if !self.is_shut_down() {
            let _ = self.notice_tx.send(notice);
        }
    }

    /// Log a failed operation, emit a notice and hand the error back.
    pub fn report_failure(&self, operation: &'static str, err: ClientError) -> ClientError {
        log_failure(operation, &err);
        self.notify(Notice::from_error(operation, &err));
        err
    }
}

/// Log `err` at the level its metadata asks for.
pub(crate) fn log_failure(operation: &'static str, err: &ClientError) {
    match err.log_level() {
        LogLevel::Error => tracing::error!(
            operation,
            error = %err,
            error_code = err.error_code(),
            recoverable = err.is_recoverable(),
            "Operation failed"
        ),
        LogLevel::Warn => tracing::warn!(
            operation,
            error = %err,
            error_code = err.error_code(),
            recoverable = err.is_recoverable(),
            "Operation failed"
        ),
        LogLevel::Debug => tracing::debug!(
            operation,
            error = %err,
            error_code = err.error_code(),
            "Operation rejected"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{ChangeAction, FilesChanged};
    use crate::test_helpers::{record, FakeBackend};
    use openexam_core::models::FileCategory;
    use std::collections::HashSet;

    fn config() -> StoreConfig {
        StoreConfig {
            request_timeout: Duration::from_secs(60),
            refresh_debounce: Duration::from_millis(100),
            tombstone_grace: Duration::from_secs(30),
            delete_recovery: RecoveryPolicy::KeepOptimistic,
        }
    }

    fn keys(view: &FileView) -> Vec<String> {
        view.iter().map(|r| r.key.clone()).collect()
    }

    fn assert_unique_keys(view: &FileView) {
        let unique: HashSet<&str> = view.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(unique.len(), view.len(), "duplicate keys in {:?}", keys(view));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_twice_is_idempotent() {
        let backend = FakeBackend::with_files(vec![
            record("1", "slides/7/a.pdf", 9),
            record("2", "slides/7/b.pdf", 12),
        ]);
        let store = FileStore::new(backend.clone(), config());

        assert_eq!(store.refresh().await.unwrap(), RefreshOutcome::Applied);
        let first = store.view();
        store.refresh().await.unwrap();

        assert_eq!(first, store.view());
        assert_eq!(keys(&first), vec!["slides/7/b.pdf", "slides/7/a.pdf"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_placeholder_replaced_when_server_lists_it() {
        let backend = FakeBackend::new();
        let store = FileStore::new(backend.clone(), config());

        let added = store
            .record_optimistic_add(&[PendingFile::uploaded("slides/7/ab12cd_A.pdf", "A.pdf")])
            .await;
        assert_eq!(added.len(), 1);
        assert!(added[0].id.starts_with("upload-"));
        assert!(store.view()[0].is_placeholder());

        backend.set_files(vec![record("srv-1", "slides/7/ab12cd_A.pdf", 10)]);
        store.refresh().await.unwrap();

        let view = store.view();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, "srv-1");
        assert!(!view[0].is_placeholder());
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_race_keeps_placeholder_until_listed() {
        let backend = FakeBackend::with_files(vec![record("1", "slides/7/old.pdf", 8)]);
        let store = FileStore::new(backend.clone(), config());
        store.refresh().await.unwrap();

        store
            .record_optimistic_add(&[PendingFile::uploaded("slides/7/ab12cd_A.pdf", "A.pdf")])
            .await;

        // Listing service has not caught up yet.
        store.refresh().await.unwrap();
        assert_eq!(
            keys(&store.view()),
            vec!["slides/7/ab12cd_A.pdf", "slides/7/old.pdf"]
        );
        assert!(store.view()[0].is_placeholder());

        backend.set_files(vec![
            record("2", "slides/7/ab12cd_A.pdf", 10),
            record("1", "slides/7/old.pdf", 8),
        ]);
        store.refresh().await.unwrap();
        let view = store.view();
        assert_eq!(view.iter().filter(|r| r.key == "slides/7/ab12cd_A.pdf").count(), 1);
        assert!(view.iter().all(|r| !r.is_placeholder()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_optimistic_add_schedules_debounced_refresh() {
        let backend = FakeBackend::new();
        let store = FileStore::new(backend.clone(), config());

        store
            .record_optimistic_add(&[PendingFile::uploaded("slides/7/k_a.pdf", "a.pdf")])
            .await;
        store
            .record_optimistic_add(&[PendingFile::uploaded("slides/7/k_b.pdf", "b.pdf")])
            .await;
        assert_eq!(backend.list_calls(), 0);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(backend.list_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tombstone_suppresses_stale_listing_then_expires() {
        let listing = vec![
            record("b", "cheatsheets/7/xyz_B.pdf", 10),
            record("a", "slides/7/a.pdf", 9),
        ];
        let backend = FakeBackend::with_files(listing);
        let store = FileStore::new(backend.clone(), config());
        store.refresh().await.unwrap();

        let removed = store
            .record_optimistic_delete("cheatsheets/7/xyz_B.pdf")
            .await
            .unwrap();
        assert_eq!(removed.map(|r| r.id), Some("b".to_string()));
        assert_eq!(
            backend.deleted(),
            vec![(FileCategory::Cheatsheets, "xyz_B.pdf".to_string())]
        );

        // Listing still reports the deleted file (eventual consistency).
        tokio::time::advance(Duration::from_secs(5)).await;
        store.refresh().await.unwrap();
        assert_eq!(keys(&store.view()), vec!["slides/7/a.pdf"]);

        tokio::time::advance(Duration::from_secs(26)).await;
        store.refresh().await.unwrap();
        assert_eq!(
            keys(&store.view()),
            vec!["cheatsheets/7/xyz_B.pdf", "slides/7/a.pdf"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_then_stale_refresh_stays_hidden() {
        let backend = FakeBackend::with_files(vec![record("x", "slides/7/k_x.pdf", 10)]);
        let store = FileStore::new(backend.clone(), config());
        store.refresh().await.unwrap();

        store.record_optimistic_delete("slides/7/k_x.pdf").await.unwrap();
        backend.set_files(vec![record("x", "slides/7/k_x.pdf", 10)]);
        tokio::time::advance(Duration::from_secs(1)).await;
        store.refresh().await.unwrap();

        assert!(store.view().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_in_flight_during_delete_stays_hidden() {
        let backend = FakeBackend::with_files(vec![
            record("x", "slides/7/k_x.pdf", 10),
            record("y", "slides/7/k_y.pdf", 9),
        ]);
        let store = FileStore::new(backend.clone(), config());
        store.refresh().await.unwrap();

        backend.set_list_delay(Duration::from_secs(2));
        let in_flight = {
            let store = store.clone();
            tokio::spawn(async move { store.refresh().await })
        };
        // The request has captured the listing that still contains x.
        tokio::task::yield_now().await;

        store.record_optimistic_delete("slides/7/k_x.pdf").await.unwrap();
        assert_eq!(keys(&store.view()), vec!["slides/7/k_y.pdf"]);

        assert_eq!(in_flight.await.unwrap().unwrap(), RefreshOutcome::Applied);
        assert_eq!(keys(&store.view()), vec!["slides/7/k_y.pdf"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delete_keeps_record_hidden_by_default() {
        let backend = FakeBackend::with_files(vec![record("x", "slides/7/k_x.pdf", 10)]);
        let store = FileStore::new(backend.clone(), config());
        store.refresh().await.unwrap();
        let mut notices = store.subscribe_notices();

        backend.fail_deletes(ClientError::server_rejected(
            400,
            "You are not the owner of this file",
        ));
        let err = store
            .record_optimistic_delete("slides/7/k_x.pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::ServerRejected { status: 400, .. }));
        assert!(store.view().is_empty());
        let notice = notices.recv().await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "You are not the owner of this file");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delete_rolls_back_when_configured() {
        let backend = FakeBackend::with_files(vec![
            record("x", "slides/7/k_x.pdf", 10),
            record("y", "slides/7/k_y.pdf", 9),
        ]);
        let store = FileStore::new(
            backend.clone(),
            StoreConfig {
                delete_recovery: RecoveryPolicy::Rollback,
                ..config()
            },
        );
        store.refresh().await.unwrap();
        let before = store.view();

        backend.fail_deletes(ClientError::NetworkFailure("connection reset".into()));
        store
            .record_optimistic_delete("slides/7/k_x.pdf")
            .await
            .unwrap_err();

        assert_eq!(store.view(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_rejects_malformed_key_without_touching_view() {
        let backend = FakeBackend::with_files(vec![record("x", "slides/7/k_x.pdf", 10)]);
        let store = FileStore::new(backend.clone(), config());
        store.refresh().await.unwrap();

        let err = store.record_optimistic_delete("k_x.pdf").await.unwrap_err();
        assert!(matches!(err, ClientError::ValidationFailure(_)));
        assert_eq!(store.view().len(), 1);
        assert!(backend.deleted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_failure_keeps_previous_view() {
        let backend = FakeBackend::with_files(vec![record("1", "slides/7/a.pdf", 9)]);
        let store = FileStore::new(backend.clone(), config());
        store.refresh().await.unwrap();
        let mut notices = store.subscribe_notices();

        backend.fail_lists(ClientError::server_rejected(503, "unavailable"));
        let err = store.refresh().await.unwrap_err();

        assert!(matches!(err, ClientError::ServerRejected { status: 503, .. }));
        assert_eq!(keys(&store.view()), vec!["slides/7/a.pdf"]);
        assert_eq!(notices.recv().await.unwrap().code, "SERVER_ERROR");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_refresh_times_out() {
        let backend = FakeBackend::new();
        backend.set_list_delay(Duration::from_secs(120));
        let store = FileStore::new(backend.clone(), config());

        let err = store.refresh().await.unwrap_err();
        assert!(matches!(err, ClientError::TimedOut { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_refresh_response_is_discarded() {
        let backend = FakeBackend::with_files(vec![record("old", "slides/7/old.pdf", 8)]);
        backend.set_list_delay(Duration::from_secs(5));
        let store = FileStore::new(backend.clone(), config());

        let slow = {
            let store = store.clone();
            tokio::spawn(async move { store.refresh().await })
        };
        // Let the slow request capture the old listing before it changes.
        tokio::task::yield_now().await;

        backend.set_files(vec![record("new", "slides/7/new.pdf", 12)]);
        backend.set_list_delay(Duration::from_secs(1));
        assert_eq!(store.refresh().await.unwrap(), RefreshOutcome::Applied);

        assert_eq!(slow.await.unwrap().unwrap(), RefreshOutcome::Stale);
        assert_eq!(keys(&store.view()), vec!["slides/7/new.pdf"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_stay_unique_across_operation_mix() {
        let backend = FakeBackend::with_files(vec![
            record("1", "slides/7/k_a.pdf", 8),
            record("2", "slides/7/k_b.pdf", 9),
        ]);
        let store = FileStore::new(backend.clone(), config());
        store.refresh().await.unwrap();
        assert_unique_keys(&store.view());

        store
            .record_optimistic_add(&[
                PendingFile::uploaded("slides/7/k_a.pdf", "a.pdf"),
                PendingFile::uploaded("slides/7/k_c.pdf", "c.pdf"),
                PendingFile::uploaded("slides/7/k_c.pdf", "c.pdf"),
            ])
            .await;
        assert_unique_keys(&store.view());

        store.record_optimistic_delete("slides/7/k_b.pdf").await.unwrap();
        assert_unique_keys(&store.view());

        backend.set_files(vec![
            record("3", "slides/7/k_c.pdf", 11),
            record("1", "slides/7/k_a.pdf", 8),
            record("2", "slides/7/k_b.pdf", 9),
        ]);
        store.refresh().await.unwrap();
        assert_unique_keys(&store.view());
        assert_eq!(
            keys(&store.view()),
            vec!["slides/7/k_c.pdf", "slides/7/k_a.pdf"]
        );

        store
            .replace_all(vec![record("1", "slides/7/k_a.pdf", 8)])
            .await;
        assert_unique_keys(&store.view());
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_subscribers_see_updates() {
        let backend = FakeBackend::with_files(vec![record("1", "slides/7/a.pdf", 9)]);
        let store = FileStore::new(backend.clone(), config());
        let mut views = store.subscribe_view();

        store.refresh().await.unwrap();
        views.changed().await.unwrap();
        assert_eq!(views.borrow_and_update().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attached_store_refreshes_on_bus_event() {
        let backend = FakeBackend::with_files(vec![record("1", "slides/7/a.pdf", 9)]);
        let store = FileStore::new(backend.clone(), config());
        let bus = EventBus::new();
        let subscription = store.attach(&bus).await;

        bus.publish(
            FILES_CHANGED_CHANNEL,
            Some(FilesChanged::new(ChangeAction::Uploaded, Vec::new())),
        )
        .await;
        bus.publish(FILES_CHANGED_CHANNEL, None).await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(backend.list_calls(), 1);
        assert_eq!(store.view().len(), 1);

        drop(subscription);
        tokio::task::yield_now().await;
        bus.publish(FILES_CHANGED_CHANNEL, None).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(backend.list_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_refresh() {
        let backend = FakeBackend::new();
        let store = FileStore::new(backend.clone(), config());

        store
            .record_optimistic_add(&[PendingFile::uploaded("slides/7/k_a.pdf", "a.pdf")])
            .await;
        store.shutdown();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(backend.list_calls(), 0);
        assert!(store.is_shut_down());
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_refresh_dropped_after_shutdown() {
        let backend = FakeBackend::with_files(vec![record("1", "slides/7/a.pdf", 9)]);
        backend.set_list_delay(Duration::from_secs(1));
        let store = FileStore::new(backend.clone(), config());

        let pending = {
            let store = store.clone();
            tokio::spawn(async move { store.refresh().await })
        };
        tokio::task::yield_now().await;
        store.shutdown();

        assert_eq!(pending.await.unwrap().unwrap(), RefreshOutcome::Discarded);
        assert!(store.view().is_empty());
    }
}
