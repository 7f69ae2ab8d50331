use serde::{Deserialize, Serialize};

use super::file::FileRecord;

/// Response of `GET /api/cheatsheet/files`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<FileRecord>,
}

/// Presigned URL for a direct PUT to object storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignedUploadResponse {
    /// Final storage key of the object once the PUT succeeds
    pub key: String,
    pub url: String,
    /// Seconds the URL stays valid, as sent by the gateway
    #[serde(default)]
    pub expires_in: Option<String>,
}

/// Presigned URL for a direct GET from object storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignedDownloadResponse {
    pub url: String,
    #[serde(default)]
    pub expires_in: Option<String>,
}

/// Body of `POST /api/cheatsheet/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub file_ids: Vec<String>,
}

/// Descriptor of a derived file returned by the generate endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    #[serde(rename = "file_id")]
    pub id: String,
    pub key: String,
}

/// Error body returned by the gateway: `{ "status": 404, "message": "..." }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default, alias = "error")]
    pub message: Option<String>,
}
