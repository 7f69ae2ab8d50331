//! Client-side input validation, applied before any request is made.

use crate::constants::{MAX_UPLOAD_BATCH, MAX_UPLOAD_SIZE_BYTES};
use crate::error::{ClientError, ClientResult};

/// Validate one file selected for upload.
pub fn validate_upload(filename: &str, size_bytes: u64) -> ClientResult<()> {
    let is_pdf = std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(ClientError::validation(format!(
            "{} is not a PDF file",
            filename
        )));
    }
    if size_bytes == 0 {
        return Err(ClientError::validation(format!("{} is empty", filename)));
    }
    if size_bytes > MAX_UPLOAD_SIZE_BYTES {
        return Err(ClientError::validation(format!(
            "{} exceeds 50MB limit",
            filename
        )));
    }
    Ok(())
}

/// Validate the number of files in one upload batch.
pub fn validate_upload_batch(count: usize) -> ClientResult<()> {
    if count == 0 {
        return Err(ClientError::validation("No files selected for upload"));
    }
    if count > MAX_UPLOAD_BATCH {
        return Err(ClientError::validation(format!(
            "You can upload a maximum of {} files at once",
            MAX_UPLOAD_BATCH
        )));
    }
    Ok(())
}

/// Validate a share target typed by the user. Returns the trimmed user id.
pub fn validate_share_target<'a>(
    input: &'a str,
    current_user_id: &str,
    already_shared: &[String],
) -> ClientResult<&'a str> {
    let target = input.trim();
    if target.is_empty() {
        return Err(ClientError::validation("Please enter a User ID"));
    }
    if !target.chars().all(|c| c.is_ascii_digit()) {
        return Err(ClientError::validation("User ID must contain only numbers"));
    }
    if target == current_user_id {
        return Err(ClientError::validation(
            "You cannot share a file with yourself",
        ));
    }
    if already_shared.iter().any(|id| id == target) {
        return Err(ClientError::validation(
            "This file is already shared with this user",
        ));
    }
    Ok(target)
}

/// Validate the source list of a generation request.
pub fn validate_generate_sources(file_ids: &[String]) -> ClientResult<()> {
    if file_ids.is_empty() {
        return Err(ClientError::validation("file_ids is required"));
    }
    if file_ids.iter().any(|id| id.trim().is_empty()) {
        return Err(ClientError::validation("file_ids must not contain empty ids"));
    }
    Ok(())
}
