//! OpenExam sync engine
//!
//! Keeps a local view of the caller's files consistent with an eventually
//! consistent backend: optimistic placeholders for uploads and generations,
//! tombstones for deletes, debounced full refreshes triggered through a
//! process-wide event bus.

pub mod actions;
pub mod bus;
pub mod debounce;
pub mod share;
pub mod state;
pub mod store;
pub mod tombstones;

// Test helpers (only available in test mode)
#[cfg(test)]
pub mod test_helpers;

pub use actions::{FileActions, UploadReport, UploadSource, UploadSummary};
pub use bus::{ChangeAction, EventBus, FilesChanged, Subscription};
pub use share::ShareRoster;
pub use store::{
    FileStore, FileView, Notice, NoticeLevel, RefreshOutcome, StoreBackend, StoreConfig,
};
