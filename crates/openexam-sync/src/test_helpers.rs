//! In-memory backend for store, action and share tests.
//!
//! The listing is driven explicitly with `set_files`; deletes and uploads are
//! recorded but never change it, which is how tests model a listing service
//! that lags behind writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use openexam_core::models::{
    FileCategory, FileDetails, FileRecord, GeneratedFile, RecordOrigin, Share,
};
use openexam_core::{
    ClientError, ClientResult, FileDeletion, FileListing, FileSharing, FileTransfer,
};

/// Server record created on 2025-03-20 at `hour`:00 UTC, owned by user 7.
pub fn record(id: &str, key: &str, hour: u32) -> FileRecord {
    FileRecord {
        id: id.to_string(),
        key: key.to_string(),
        name: key.rsplit('/').next().unwrap_or(key).to_string(),
        owner_id: "7".to_string(),
        created_at: Utc.with_ymd_and_hms(2025, 3, 20, hour, 0, 0).unwrap(),
        category: None,
        origin: RecordOrigin::Server,
    }
}

/// `ClientError` is not `Clone`; configured failures are re-created per call.
fn replicate(err: &ClientError) -> ClientError {
    match err {
        ClientError::NetworkFailure(message) => ClientError::NetworkFailure(message.clone()),
        ClientError::ServerRejected { status, message } => {
            ClientError::server_rejected(*status, message.clone())
        }
        ClientError::ValidationFailure(message) => ClientError::validation(message.clone()),
        ClientError::NotFound(message) => ClientError::NotFound(message.clone()),
        ClientError::TimedOut { operation, after } => ClientError::timed_out(*operation, *after),
        ClientError::Io(e) => ClientError::Io(std::io::Error::new(e.kind(), e.to_string())),
    }
}

#[derive(Default)]
struct FakeState {
    files: Vec<FileRecord>,
    list_delay: Duration,
    list_error: Option<ClientError>,
    delete_error: Option<ClientError>,
    upload_errors: HashMap<String, ClientError>,
    generate_error: Option<ClientError>,
    generate_delay: Duration,
    share_error: Option<ClientError>,
    unshare_error: Option<ClientError>,
    shares: HashMap<String, Vec<Share>>,
    deleted: Vec<(FileCategory, String)>,
    uploaded: Vec<String>,
    shared: Vec<(String, String)>,
    unshared: Vec<(String, String)>,
}

/// Fake implementation of every backend collaborator.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
    list_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_files(files: Vec<FileRecord>) -> Arc<Self> {
        let backend = Self::new();
        backend.set_files(files);
        backend
    }

    pub fn set_files(&self, files: Vec<FileRecord>) {
        self.state.lock().unwrap().files = files;
    }

    pub fn set_list_delay(&self, delay: Duration) {
        self.state.lock().unwrap().list_delay = delay;
    }

    pub fn set_generate_delay(&self, delay: Duration) {
        self.state.lock().unwrap().generate_delay = delay;
    }

    pub fn fail_lists(&self, err: ClientError) {
        self.state.lock().unwrap().list_error = Some(err);
    }

    pub fn fail_deletes(&self, err: ClientError) {
        self.state.lock().unwrap().delete_error = Some(err);
    }

    pub fn fail_upload_of(&self, filename: &str, err: ClientError) {
        self.state
            .lock()
            .unwrap()
            .upload_errors
            .insert(filename.to_string(), err);
    }

    pub fn fail_generate(&self, err: ClientError) {
        self.state.lock().unwrap().generate_error = Some(err);
    }

    pub fn fail_shares(&self, err: ClientError) {
        self.state.lock().unwrap().share_error = Some(err);
    }

    pub fn fail_unshares(&self, err: ClientError) {
        self.state.lock().unwrap().unshare_error = Some(err);
    }

    pub fn set_shares(&self, file_id: &str, shares: Vec<Share>) {
        self.state
            .lock()
            .unwrap()
            .shares
            .insert(file_id.to_string(), shares);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<(FileCategory, String)> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.state.lock().unwrap().uploaded.clone()
    }

    pub fn shared(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().shared.clone()
    }

    pub fn unshared(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().unshared.clone()
    }
}

#[async_trait]
impl FileListing for FakeBackend {
    async fn list_files(&self) -> ClientResult<Vec<FileRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let (files, delay, error) = {
            let state = self.state.lock().unwrap();
            (
                state.files.clone(),
                state.list_delay,
                state.list_error.as_ref().map(replicate),
            )
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match error {
            Some(err) => Err(err),
            None => Ok(files),
        }
    }
}

#[async_trait]
impl FileDeletion for FakeBackend {
    async fn delete_file(&self, category: FileCategory, filename: &str) -> ClientResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.delete_error.as_ref().map(replicate) {
            return Err(err);
        }
        state.deleted.push((category, filename.to_string()));
        Ok(())
    }
}

#[async_trait]
impl FileTransfer for FakeBackend {
    async fn upload_file(&self, filename: &str, _data: Bytes) -> ClientResult<String> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.upload_errors.get(filename).map(replicate) {
            return Err(err);
        }
        let key = format!("slides/7/abc123_{}", filename);
        state.uploaded.push(key.clone());
        Ok(key)
    }

    async fn generate_derived_file(
        &self,
        source_file_ids: &[String],
    ) -> ClientResult<GeneratedFile> {
        let (delay, error) = {
            let state = self.state.lock().unwrap();
            (state.generate_delay, state.generate_error.as_ref().map(replicate))
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = error {
            return Err(err);
        }
        Ok(GeneratedFile {
            id: format!("gen-{}", source_file_ids.join("-")),
            key: format!("cheatsheets/7/gen123_{}.pdf", source_file_ids.join("_")),
        })
    }
}

#[async_trait]
impl FileSharing for FakeBackend {
    async fn get_file(&self, file_id: &str) -> ClientResult<FileDetails> {
        let state = self.state.lock().unwrap();
        let file = state
            .files
            .iter()
            .find(|f| f.id == file_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound("file not found".to_string()))?;
        let shares = state.shares.get(file_id).cloned().unwrap_or_default();
        Ok(FileDetails { file, shares })
    }

    async fn share_file(&self, file_id: &str, user_id: &str) -> ClientResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.share_error.as_ref().map(replicate) {
            return Err(err);
        }
        state
            .shared
            .push((file_id.to_string(), user_id.to_string()));
        Ok(())
    }

    async fn unshare_file(&self, file_id: &str, user_id: &str) -> ClientResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.unshare_error.as_ref().map(replicate) {
            return Err(err);
        }
        state
            .unshared
            .push((file_id.to_string(), user_id.to_string()));
        Ok(())
    }
}
