//! Upload intake
//!
//! Persists an uploaded file under the uploads directory, fingerprints the
//! request's bytes and inserts the video row. The order is fixed:
//! file write, fingerprint, insert, then the caller responds.
//!
//! The digest is taken over the bytes the request carried, never read back
//! from disk: a concurrent upload with the same filename may already have
//! replaced the file.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::db::{NewVideo, Store, StoreError};

/// Upload intake errors
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid upload: {0}")]
    Validation(String),

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to record upload: {0}")]
    Persistence(#[from] StoreError),
}

/// Optional descriptive fields supplied with an upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoMetadata {
    pub user_email: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// A successfully ingested upload
#[derive(Debug, Clone)]
pub struct IngestedVideo {
    pub id: i64,
    pub filename: String,
    pub fingerprint: String,
    /// Location of the stored file
    pub path: PathBuf,
    pub metadata: VideoMetadata,
}

/// Writes uploads to disk and records them in the store.
pub struct UploadIntake {
    uploads_dir: PathBuf,
    store: Arc<dyn Store>,
}

impl UploadIntake {
    pub fn new(uploads_dir: impl Into<PathBuf>, store: Arc<dyn Store>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            store,
        }
    }

    /// Ingest one upload.
    ///
    /// An existing file with the same name is overwritten. When the insert
    /// fails after the write succeeded the file stays on disk and is logged
    /// as orphaned.
    pub async fn ingest(
        &self,
        filename: &str,
        data: &[u8],
        metadata: VideoMetadata,
    ) -> Result<IngestedVideo, IngestError> {
        validate_filename(filename)?;

        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        let path = self.uploads_dir.join(filename);
        tokio::fs::write(&path, data).await?;

        let fingerprint = marine_core::fingerprint(data);

        let id = match self
            .store
            .insert_video(NewVideo {
                filename: filename.to_string(),
                fingerprint: fingerprint.clone(),
                user_email: metadata.user_email.clone(),
                title: metadata.title.clone(),
                description: metadata.description.clone(),
            })
            .await
        {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Video insert failed, stored file is orphaned"
                );
                return Err(e.into());
            }
        };

        tracing::info!(
            video_id = id,
            filename = %filename,
            fingerprint = %fingerprint,
            size = data.len(),
            "Upload ingested"
        );

        Ok(IngestedVideo {
            id,
            filename: filename.to_string(),
            fingerprint,
            path,
            metadata,
        })
    }
}

/// Filenames key the stored file, so they must name a single entry inside
/// the uploads directory.
fn validate_filename(filename: &str) -> Result<(), IngestError> {
    if filename.trim().is_empty() {
        return Err(IngestError::Validation("filename is required".to_string()));
    }
    if filename == "." || filename == ".." {
        return Err(IngestError::Validation(format!(
            "'{}' is not a valid filename",
            filename
        )));
    }
    if filename.contains(['/', '\\', '\0']) {
        return Err(IngestError::Validation(format!(
            "filename '{}' must not contain path separators",
            filename
        )));
    }
    Ok(())
}
