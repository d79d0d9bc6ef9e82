//! Discovery service client
//!
//! Best-effort forward of a stored upload to `POST {base}/discover`.
//! Only status 200 counts as success; the response body is ignored.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::ingest::VideoMetadata;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Failed to open upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("Discovery service unreachable: {0}")]
    Transport(String),

    #[error("Discovery service returned {0}")]
    Status(u16),
}

#[derive(Clone)]
pub struct DiscoveryClient {
    client: Client,
    endpoint: String,
}

impl DiscoveryClient {
    pub fn new(base_url: &str) -> Result<Self, DiscoveryError> {
        let client = Client::builder()
            .build()
            .map_err(|e| DiscoveryError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/discover", base_url.trim_end_matches('/')),
        })
    }

    pub async fn forward(
        &self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), DiscoveryError> {
        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let form = Form::new()
            .part("file", Part::stream_with_length(file, length).file_name(file_name))
            .text("name", metadata.title.clone().unwrap_or_default())
            .text("description", metadata.description.clone().unwrap_or_default());

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| DiscoveryError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::OK => Ok(()),
            other => Err(DiscoveryError::Status(other.as_u16())),
        }
    }
}
