//! User-initiated file actions: upload, generate, delete.
//!
//! Each action validates locally, calls the backend, updates the acting
//! store optimistically and announces the change on the event bus so every
//! other store copy refreshes.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;
use openexam_core::constants::FILES_CHANGED_CHANNEL;
use openexam_core::models::{FileRecord, GeneratedFile, PendingFile};
use openexam_core::validation::{validate_generate_sources, validate_upload, validate_upload_batch};
use openexam_core::{ClientConfig, ClientError, ClientResult, ErrorMetadata, FileBackend};
use serde::Serialize;

use crate::bus::{ChangeAction, EventBus, FilesChanged};
use crate::store::{FileStore, Notice};

/// A PDF selected for upload.
#[derive(Debug, Clone)]
pub struct UploadSource {
    pub filename: String,
    pub data: Bytes,
}

impl UploadSource {
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Read a local file. The upload name is the file name component of `path`.
    ///
    /// Oversized or non-PDF files are rejected before anything is read.
    pub async fn from_path(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ClientError::validation(format!("{} has no usable file name", path.display()))
            })?
            .to_string();
        let size = tokio::fs::metadata(path).await?.len();
        validate_upload(&filename, size)?;
        let data = tokio::fs::read(path).await?;
        Ok(Self::new(filename, data))
    }
}

/// One file that could not be uploaded.
#[derive(Debug)]
pub struct UploadFailure {
    pub filename: String,
    pub error: ClientError,
}

/// Per-file outcome of an upload batch. Partial success is allowed.
#[derive(Debug, Default)]
pub struct UploadReport {
    /// Placeholders recorded for the files that reached storage.
    pub uploaded: Vec<FileRecord>,
    pub failed: Vec<UploadFailure>,
}

impl UploadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Serializable summary for CLI output.
#[derive(Debug, Serialize)]
pub struct UploadSummary {
    pub uploaded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl From<&UploadReport> for UploadSummary {
    fn from(report: &UploadReport) -> Self {
        Self {
            uploaded: report.uploaded.iter().map(|r| r.key.clone()).collect(),
            failed: report
                .failed
                .iter()
                .map(|f| (f.filename.clone(), f.error.to_string()))
                .collect(),
        }
    }
}

pub struct FileActions {
    backend: Arc<dyn FileBackend>,
    store: Arc<FileStore>,
    bus: EventBus,
    request_timeout: Duration,
    generate_timeout: Duration,
}

impl FileActions {
    pub fn new(
        backend: Arc<dyn FileBackend>,
        store: Arc<FileStore>,
        bus: EventBus,
        config: &ClientConfig,
    ) -> Self {
        Self {
            backend,
            store,
            bus,
            request_timeout: config.request_timeout,
            generate_timeout: config.generate_timeout,
        }
    }

    pub fn store(&self) -> &Arc<FileStore> {
        &self.store
    }

    /// Upload a batch of PDFs.
    ///
    /// The whole batch is validated before any request is made; a validation
    /// failure rejects everything. Network failures are reported per file.
    #[tracing::instrument(skip(self, sources), fields(count = sources.len()))]
    pub async fn upload_files(&self, sources: Vec<UploadSource>) -> ClientResult<UploadReport> {
        validate_upload_batch(sources.len())
            .map_err(|err| self.store.report_failure("upload files", err))?;
        for source in &sources {
            validate_upload(&source.filename, source.data.len() as u64)
                .map_err(|err| self.store.report_failure("upload files", err))?;
        }

        let uploads = sources.into_iter().map(|source| async move {
            let result = tokio::time::timeout(
                self.request_timeout,
                self.backend
                    .upload_file(&source.filename, source.data.clone()),
            )
            .await
            .unwrap_or_else(|_| Err(ClientError::timed_out("upload file", self.request_timeout)));
            (source.filename, result)
        });

        let mut pending = Vec::new();
        let mut report = UploadReport::default();
        for (filename, result) in join_all(uploads).await {
            match result {
                Ok(key) => {
                    tracing::info!(filename = %filename, key = %key, "File uploaded");
                    pending.push(PendingFile::uploaded(key, filename));
                }
                Err(error) => {
                    let error = self.store.report_failure("upload file", error);
                    report.failed.push(UploadFailure { filename, error });
                }
            }
        }

        if !pending.is_empty() {
            report.uploaded = self.store.record_optimistic_add(&pending).await;
            self.store.notify(Notice::info(
                "upload files",
                format!("{} file(s) uploaded successfully", pending.len()),
            ));
            self.announce(ChangeAction::Uploaded, report.uploaded.clone())
                .await;
        }

        Ok(report)
    }

    /// Generate a cheatsheet from uploaded slides.
    #[tracing::instrument(skip(self))]
    pub async fn generate(&self, file_ids: &[String]) -> ClientResult<GeneratedFile> {
        validate_generate_sources(file_ids)
            .map_err(|err| self.store.report_failure("generate cheatsheet", err))?;

        let generated = match tokio::time::timeout(
            self.generate_timeout,
            self.backend.generate_derived_file(file_ids),
        )
        .await
        {
            Ok(Ok(generated)) => generated,
            Ok(Err(err)) => return Err(self.store.report_failure("generate cheatsheet", err)),
            Err(_) => {
                let err = ClientError::timed_out("generate cheatsheet", self.generate_timeout);
                return Err(self.store.report_failure("generate cheatsheet", err));
            }
        };

        tracing::info!(file_id = %generated.id, key = %generated.key, "Cheatsheet generated");
        let placeholders = self
            .store
            .record_optimistic_add(&[PendingFile::generated(generated.key.clone())])
            .await;
        self.store.notify(Notice::info(
            "generate cheatsheet",
            "Cheatsheet generated successfully",
        ));
        self.announce(ChangeAction::Generated, placeholders).await;
        Ok(generated)
    }

    /// Check whether the listing now contains `generated`. If it does, the
    /// listing replaces the store contents and every placeholder is dropped.
    pub async fn confirm_generation(&self, generated: &GeneratedFile) -> ClientResult<bool> {
        let records = match tokio::time::timeout(self.request_timeout, self.backend.list_files())
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(ClientError::timed_out(
                    "confirm generation",
                    self.request_timeout,
                ))
            }
        };

        if !records.iter().any(|r| r.key == generated.key) {
            return Ok(false);
        }
        self.store.replace_all(records).await;
        Ok(true)
    }

    /// Poll [`FileActions::confirm_generation`] until it succeeds or the
    /// generate timeout elapses.
    pub async fn wait_for_generated(
        &self,
        generated: &GeneratedFile,
        poll_interval: Duration,
    ) -> ClientResult<bool> {
        let deadline = tokio::time::Instant::now() + self.generate_timeout;
        loop {
            match self.confirm_generation(generated).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(err) if err.is_recoverable() => {
                    tracing::debug!(error = %err, "Confirmation poll failed, retrying");
                }
                Err(err) => return Err(err),
            }
            if tokio::time::Instant::now() + poll_interval > deadline {
                return Ok(false);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Delete a file optimistically and announce it.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> ClientResult<Option<FileRecord>> {
        let removed = self.store.record_optimistic_delete(key).await?;
        self.announce(ChangeAction::Deleted, removed.iter().cloned().collect())
            .await;
        Ok(removed)
    }

    async fn announce(&self, action: ChangeAction, files: Vec<FileRecord>) {
        let delivered = self
            .bus
            .publish(FILES_CHANGED_CHANNEL, Some(FilesChanged::new(action, files)))
            .await;
        tracing::debug!(?action, delivered, "Announced file change");
    }
}
