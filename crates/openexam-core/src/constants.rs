//! Shared constants.

use std::time::Duration;

/// Channel name used to announce that the caller's file set changed.
pub const FILES_CHANGED_CHANNEL: &str = "filesChanged";

/// Id prefix of placeholders synthesized for uploads.
pub const UPLOAD_PLACEHOLDER_PREFIX: &str = "upload-";

/// Id prefix of placeholders synthesized for generated cheatsheets.
pub const GENERATE_PLACEHOLDER_PREFIX: &str = "generate-";

/// How long a deleted key stays hidden from server refreshes.
pub const DEFAULT_TOMBSTONE_GRACE: Duration = Duration::from_secs(30);

/// Trailing-edge delay used to coalesce refresh requests.
pub const DEFAULT_REFRESH_DEBOUNCE: Duration = Duration::from_millis(100);

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Generation typically takes ~30s but may run up to two minutes.
pub const DEFAULT_GENERATE_TIMEOUT: Duration = Duration::from_secs(120);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Maximum size of a single uploaded PDF.
pub const MAX_UPLOAD_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Maximum number of files accepted in one upload batch.
pub const MAX_UPLOAD_BATCH: usize = 10;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
