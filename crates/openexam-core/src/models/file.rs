use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{GENERATE_PLACEHOLDER_PREFIX, UPLOAD_PLACEHOLDER_PREFIX};
use crate::error::ClientError;

/// File category. The backend stores slides and cheatsheets under separate
/// key prefixes and the deletion endpoint is addressed by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Slides,
    Cheatsheets,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Slides => "slides",
            FileCategory::Cheatsheets => "cheatsheets",
        }
    }

    /// Classify a storage key by its first path segment.
    ///
    /// Accepts the legacy singular `slide/` prefix the generator still emits.
    pub fn from_key(key: &str) -> Option<Self> {
        let first = key.trim_start_matches('/').split('/').next()?;
        match first {
            "slides" | "slide" => Some(FileCategory::Slides),
            "cheatsheets" => Some(FileCategory::Cheatsheets),
            _ => None,
        }
    }

    /// Classify by a substring match on the file name.
    #[deprecated(note = "misclassifies slides whose name contains \"cheatsheet\"; use FileCategory::from_key")]
    pub fn from_legacy_filename(name: &str) -> Self {
        if name.contains("cheatsheet") {
            FileCategory::Cheatsheets
        } else {
            FileCategory::Slides
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileCategory {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "slides" | "slide" => Ok(FileCategory::Slides),
            "cheatsheets" => Ok(FileCategory::Cheatsheets),
            other => Err(ClientError::validation(format!(
                "Unknown file category '{}', expected 'slides' or 'cheatsheets'",
                other
            ))),
        }
    }
}

/// Where a record in the local view came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordOrigin {
    /// Returned by the file listing service.
    #[default]
    Server,
    /// Synthesized locally before the server confirmed it.
    Placeholder,
}

/// A file known to the client (slide or generated cheatsheet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub key: String,
    pub name: String,
    #[serde(rename = "userId")]
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    /// Explicit category when the backend sends one; otherwise derived from the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FileCategory>,
    #[serde(skip)]
    pub origin: RecordOrigin,
}

impl FileRecord {
    /// Category of this file. An explicit backend value wins over the key prefix.
    pub fn category(&self) -> Option<FileCategory> {
        self.category.or_else(|| FileCategory::from_key(&self.key))
    }

    pub fn is_placeholder(&self) -> bool {
        self.origin == RecordOrigin::Placeholder
    }

    /// Build a placeholder for a file the server has not listed yet.
    pub fn placeholder(pending: &PendingFile, now: DateTime<Utc>) -> Self {
        let parsed = StorageKey::parse(&pending.key).ok();
        let prefix = match pending.kind {
            PendingKind::Upload => UPLOAD_PLACEHOLDER_PREFIX,
            PendingKind::Generate => GENERATE_PLACEHOLDER_PREFIX,
        };
        let name = pending
            .name
            .clone()
            .or_else(|| parsed.as_ref().map(|k| k.display_name().to_string()))
            .unwrap_or_else(|| pending.key.clone());
        let owner_id = parsed
            .as_ref()
            .map(|k| k.owner_id.clone())
            .unwrap_or_default();

        FileRecord {
            id: format!("{}{}", prefix, Uuid::new_v4().simple()),
            key: pending.key.clone(),
            name,
            owner_id,
            created_at: now,
            category: pending
                .category
                .or_else(|| parsed.as_ref().map(|k| k.category)),
            origin: RecordOrigin::Placeholder,
        }
    }
}

/// What kind of user action produced a pending file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingKind {
    Upload,
    Generate,
}

/// A freshly uploaded or generated file the server has not listed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFile {
    pub key: String,
    pub name: Option<String>,
    pub category: Option<FileCategory>,
    pub kind: PendingKind,
}

impl PendingFile {
    pub fn uploaded(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: Some(name.into()),
            category: Some(FileCategory::Slides),
            kind: PendingKind::Upload,
        }
    }

    pub fn generated(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: None,
            category: Some(FileCategory::Cheatsheets),
            kind: PendingKind::Generate,
        }
    }
}

/// Parsed storage key: `{category}/{owner_id}/{filename}`.
///
/// Only the last path segment is treated as the filename; that is what the
/// deletion endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKey {
    pub category: FileCategory,
    pub owner_id: String,
    pub filename: String,
}

impl StorageKey {
    pub fn parse(key: &str) -> Result<Self, ClientError> {
        let trimmed = key.trim_start_matches('/');
        let parts: Vec<&str> = trimmed.split('/').collect();
        if parts.len() < 3 {
            return Err(ClientError::validation(format!(
                "Invalid key format: {}. Expected 'slides/userId/filename'",
                key
            )));
        }

        let category = FileCategory::from_key(trimmed).ok_or_else(|| {
            ClientError::validation(format!(
                "Invalid key prefix: {}. Expected 'slides' or 'cheatsheets'",
                parts[0]
            ))
        })?;

        let owner_id = parts[1];
        if owner_id.is_empty() {
            return Err(ClientError::validation(format!(
                "Missing owner id in key: {}",
                key
            )));
        }

        let filename = parts[parts.len() - 1];
        if filename.is_empty() {
            return Err(ClientError::validation(format!(
                "Missing filename in key: {}",
                key
            )));
        }

        Ok(Self {
            category,
            owner_id: owner_id.to_string(),
            filename: filename.to_string(),
        })
    }

    /// Filename without the random `{prefix}_` the backend prepends on upload.
    pub fn display_name(&self) -> &str {
        match self.filename.split_once('_') {
            Some((prefix, rest))
                if !prefix.is_empty()
                    && !rest.is_empty()
                    && prefix.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                rest
            }
            _ => &self.filename,
        }
    }
}
