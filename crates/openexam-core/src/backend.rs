//! Collaborator traits for the external REST API
//!
//! The sync engine only talks to the backend through these narrow contracts.
//! The HTTP client implements all of them; tests use in-memory fakes.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ClientResult;
use crate::models::{FileCategory, FileDetails, FileRecord, GeneratedFile};

/// Lists the complete current file set of the authenticated caller.
///
/// No pagination and no delta semantics: every call returns everything.
#[async_trait]
pub trait FileListing: Send + Sync {
    async fn list_files(&self) -> ClientResult<Vec<FileRecord>>;
}

/// Deletes one file owned by the caller.
#[async_trait]
pub trait FileDeletion: Send + Sync {
    /// `filename` is the last path segment of the storage key.
    async fn delete_file(&self, category: FileCategory, filename: &str) -> ClientResult<()>;
}

/// Uploads source files and requests derived files.
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Upload through a presigned URL and return the final storage key.
    async fn upload_file(&self, filename: &str, data: Bytes) -> ClientResult<String>;

    /// Request generation of a cheatsheet from the given source file ids.
    ///
    /// Long running; callers should allow up to two minutes.
    async fn generate_derived_file(&self, source_file_ids: &[String])
        -> ClientResult<GeneratedFile>;
}

/// Per-file sharing with other users.
#[async_trait]
pub trait FileSharing: Send + Sync {
    async fn get_file(&self, file_id: &str) -> ClientResult<FileDetails>;

    async fn share_file(&self, file_id: &str, user_id: &str) -> ClientResult<()>;

    async fn unshare_file(&self, file_id: &str, user_id: &str) -> ClientResult<()>;
}

/// Everything the store needs from the backend.
pub trait FileBackend: FileListing + FileDeletion + FileTransfer + FileSharing {}

impl<T> FileBackend for T where T: FileListing + FileDeletion + FileTransfer + FileSharing {}
