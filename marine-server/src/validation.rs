//! Upload validation module
//!
//! Provides validation utilities for multipart video uploads.

use crate::error::ApiError;

/// Allowed MIME type categories for uploads
const ALLOWED_MIME_PREFIXES: &[&str] = &["video/", "audio/", "application/octet-stream"];

/// Default max file size in bytes (500 MB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 500 * 1024 * 1024;

/// Validates the Content-Type of an uploaded file
///
/// Accepts:
/// - video/* (video/mp4, video/webm, etc.)
/// - audio/* (audio/mpeg, audio/wav, etc.)
/// - application/octet-stream (binary data)
///
/// Returns an error if the Content-Type is not supported.
pub fn validate_content_type(content_type: Option<&str>) -> Result<(), ApiError> {
    match content_type {
        Some(ct) => {
            let ct_lower = ct.to_lowercase();
            if ALLOWED_MIME_PREFIXES
                .iter()
                .any(|prefix| ct_lower.starts_with(prefix))
            {
                Ok(())
            } else {
                Err(ApiError::bad_request(format!(
                    "Unsupported Content-Type: '{}'. Allowed types: video/*, audio/*, application/octet-stream",
                    ct
                )))
            }
        }
        // Allow missing Content-Type (treat as binary)
        None => Ok(()),
    }
}

/// Validates the size of an uploaded file
///
/// Returns an error if the file exceeds the maximum size.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size > max_size {
        let max_mb = max_size / (1024 * 1024);
        let actual_mb = size / (1024 * 1024);
        Err(ApiError::bad_request(format!(
            "File too large: {} MB exceeds maximum of {} MB",
            actual_mb, max_mb
        )))
    } else {
        Ok(())
    }
}

/// Validates a URL submitted for crawling
///
/// Only non-blank absolute http(s) URLs are queued.
pub fn validate_crawl_url(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request("url must not be empty"));
    }

    let parsed = url::Url::parse(trimmed)
        .map_err(|e| ApiError::bad_request(format!("Invalid url '{}': {}", trimmed, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(ApiError::bad_request(format!(
            "Unsupported url scheme '{}'",
            other
        ))),
    }
}
