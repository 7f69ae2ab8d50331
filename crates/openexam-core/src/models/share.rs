use serde::{Deserialize, Serialize};

use super::file::FileRecord;

/// A user a file has been shared with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    pub user_id: String,
    /// Missing when the backend could not resolve the user (the user does not exist).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Response of `GET /api/cheatsheet/files/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDetails {
    pub file: FileRecord,
    #[serde(default)]
    pub shares: Vec<Share>,
}

/// Body of the share and unshare requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRequest {
    pub file_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareResponse {
    pub shared: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnshareResponse {
    pub unshared: bool,
}
