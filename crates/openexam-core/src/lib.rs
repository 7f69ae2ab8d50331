//! OpenExam Core Library
//!
//! Domain models, error types, configuration, validation and the collaborator
//! traits shared by the API client, the sync engine and the CLI.

pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod grouping;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use backend::{FileBackend, FileDeletion, FileListing, FileSharing, FileTransfer};
pub use config::{ClientConfig, RecoveryPolicy};
pub use error::{ClientError, ClientResult, ErrorMetadata, LogLevel};
pub use grouping::{group_files_by_date, DateGroups};
