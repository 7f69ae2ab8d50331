//! Domain methods for the OpenExam API client.
//!
//! Response types come from `openexam_core::models`. The collaborator trait
//! impls at the bottom are thin adapters over these methods.

use async_trait::async_trait;
use bytes::Bytes;
use openexam_core::constants::PDF_CONTENT_TYPE;
use openexam_core::models::{
    FileCategory, FileDetails, FileListResponse, FileRecord, GenerateRequest, GeneratedFile,
    PresignedDownloadResponse, PresignedUploadResponse, ShareRequest, ShareResponse,
    UnshareResponse,
};
use openexam_core::{
    ClientError, ClientResult, FileDeletion, FileListing, FileSharing, FileTransfer,
};

use crate::{ApiClient, API_PREFIX};

impl ApiClient {
    /// List every slide and cheatsheet visible to the caller.
    #[tracing::instrument(skip(self))]
    pub async fn list_files(&self) -> ClientResult<Vec<FileRecord>> {
        let response: FileListResponse = self
            .get(&format!("{}/cheatsheet/files", API_PREFIX), &[], "list files")
            .await?;
        Ok(response.files)
    }

    /// Get one file with the users it is shared with.
    pub async fn get_file(&self, file_id: &str) -> ClientResult<FileDetails> {
        self.get(
            &format!("{}/cheatsheet/files/{}", API_PREFIX, file_id),
            &[],
            "load file",
        )
        .await
    }

    /// Delete a file by category and filename (last segment of its key).
    #[tracing::instrument(skip(self))]
    pub async fn remove_file(&self, category: FileCategory, filename: &str) -> ClientResult<()> {
        self.delete(
            &format!("{}/cheatsheet/files", API_PREFIX),
            &[("file_type", category.as_str()), ("file", filename)],
            "delete file",
        )
        .await
    }

    /// Request a presigned PUT URL for a new upload.
    pub async fn presigned_upload_url(&self, filename: &str) -> ClientResult<PresignedUploadResponse> {
        self.get(
            &format!("{}/cheatsheet/presigned/upload", API_PREFIX),
            &[("filename", filename)],
            "get upload URL",
        )
        .await
    }

    /// PUT file bytes to a presigned storage URL.
    pub async fn put_to_storage(&self, presigned_url: &str, data: Bytes) -> ClientResult<()> {
        let request = self
            .client()
            .put(presigned_url)
            .header(reqwest::header::CONTENT_TYPE, PDF_CONTENT_TYPE)
            .body(data);
        self.send(request, "upload file to storage", self.request_timeout)
            .await?;
        Ok(())
    }

    /// Upload a PDF: request a presigned URL, then PUT the bytes to storage.
    /// Returns the final storage key.
    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    pub async fn upload_pdf(&self, filename: &str, data: Bytes) -> ClientResult<String> {
        let presigned = self.presigned_upload_url(filename).await?;
        self.put_to_storage(&presigned.url, data).await?;
        tracing::info!(key = %presigned.key, "Uploaded file to storage");
        Ok(presigned.key)
    }

    /// Request a presigned GET URL for a stored file.
    pub async fn presigned_download_url(&self, key: &str) -> ClientResult<PresignedDownloadResponse> {
        self.get(
            &format!("{}/cheatsheet/presigned", API_PREFIX),
            &[("key", key)],
            "get download URL",
        )
        .await
    }

    /// Download a stored file through its presigned URL.
    #[tracing::instrument(skip(self))]
    pub async fn download_file(&self, key: &str) -> ClientResult<Bytes> {
        let presigned = self.presigned_download_url(key).await?;
        let response = self
            .send(
                self.client().get(&presigned.url),
                "download file",
                self.request_timeout,
            )
            .await?;
        response
            .bytes()
            .await
            .map_err(|e| ClientError::NetworkFailure(format!("Failed to download file: {}", e)))
    }

    /// Generate a cheatsheet from uploaded slides. Can take up to two minutes.
    #[tracing::instrument(skip(self))]
    pub async fn generate_cheatsheet(&self, file_ids: &[String]) -> ClientResult<GeneratedFile> {
        let body = GenerateRequest {
            file_ids: file_ids.to_vec(),
        };
        self.post_json_with_timeout(
            &format!("{}/cheatsheet/generate", API_PREFIX),
            &body,
            "generate cheatsheet",
            self.generate_timeout(),
        )
        .await
    }

    /// Share a file with another user.
    pub async fn share(&self, file_id: &str, user_id: &str) -> ClientResult<ShareResponse> {
        let body = ShareRequest {
            file_id: file_id.to_string(),
            user_id: user_id.to_string(),
        };
        self.post_json(&format!("{}/cheatsheet/share", API_PREFIX), &body, "share file")
            .await
    }

    /// Revoke another user's access to a file.
    pub async fn unshare(&self, file_id: &str, user_id: &str) -> ClientResult<UnshareResponse> {
        let body = ShareRequest {
            file_id: file_id.to_string(),
            user_id: user_id.to_string(),
        };
        self.post_json(
            &format!("{}/cheatsheet/unshare", API_PREFIX),
            &body,
            "unshare file",
        )
        .await
    }
}

#[async_trait]
impl FileListing for ApiClient {
    async fn list_files(&self) -> ClientResult<Vec<FileRecord>> {
        ApiClient::list_files(self).await
    }
}

#[async_trait]
impl FileDeletion for ApiClient {
    async fn delete_file(&self, category: FileCategory, filename: &str) -> ClientResult<()> {
        self.remove_file(category, filename).await
    }
}

#[async_trait]
impl FileTransfer for ApiClient {
    async fn upload_file(&self, filename: &str, data: Bytes) -> ClientResult<String> {
        self.upload_pdf(filename, data).await
    }

    async fn generate_derived_file(
        &self,
        source_file_ids: &[String],
    ) -> ClientResult<GeneratedFile> {
        self.generate_cheatsheet(source_file_ids).await
    }
}

#[async_trait]
impl FileSharing for ApiClient {
    async fn get_file(&self, file_id: &str) -> ClientResult<FileDetails> {
        ApiClient::get_file(self, file_id).await
    }

    async fn share_file(&self, file_id: &str, user_id: &str) -> ClientResult<()> {
        let response = self.share(file_id, user_id).await?;
        if response.shared {
            Ok(())
        } else {
            Err(ClientError::server_rejected(200, "Failed to share file"))
        }
    }

    async fn unshare_file(&self, file_id: &str, user_id: &str) -> ClientResult<()> {
        let response = self.unshare(file_id, user_id).await?;
        if response.unshared {
            Ok(())
        } else {
            Err(ClientError::server_rejected(200, "Failed to unshare file"))
        }
    }
}
