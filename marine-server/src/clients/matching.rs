//! Matching service client
//!
//! Submits a stored upload to the external matching service as a single
//! multipart request. No retries: a failed match is reported once and dropped
//! by the caller.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use marine_core::MarineError;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::ingest::VideoMetadata;

/// Default matching request timeout
pub const DEFAULT_MATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Matching client errors
#[derive(Debug, Error)]
pub enum MatchError {
    /// The stored file could not be opened
    #[error("Failed to open upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("Matching request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Matching service unreachable: {0}")]
    Transport(String),

    /// The service answered with a non-200 status
    #[error("Matching service returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Invalid matching response: {0}")]
    Decode(String),
}

impl From<MatchError> for MarineError {
    fn from(e: MatchError) -> Self {
        match e {
            MatchError::Io(io) => MarineError::Io(io),
            MatchError::Timeout(_) => MarineError::Timeout(e.to_string()),
            MatchError::Transport(msg) => MarineError::Transport(msg),
            MatchError::Remote { status, message } => MarineError::Remote { status, message },
            MatchError::Decode(msg) => MarineError::Parse(msg),
        }
    }
}

/// Successful matching result
#[derive(Debug, Clone, Deserialize)]
pub struct MatchResponse {
    pub match_score: f64,
    #[serde(default)]
    pub computed_hash: String,
    #[serde(default)]
    pub video_metadata: HashMap<String, serde_json::Value>,
    /// Broker frame the service may have emitted for this match
    #[serde(default)]
    pub kafka_message: Option<String>,
}

#[derive(Deserialize)]
struct RemoteErrorBody {
    error: String,
}

/// Client for `POST {base}/match-video`.
#[derive(Clone)]
pub struct MatchingClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl MatchingClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MatchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MatchError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/match-video", base_url.trim_end_matches('/')),
            timeout,
        })
    }

    /// Submit the file at `path` for matching.
    ///
    /// The file is streamed from disk rather than buffered.
    pub async fn match_video(
        &self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<MatchResponse, MatchError> {
        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let form = Form::new()
            .part(
                "video_file",
                Part::stream_with_length(file, length).file_name(file_name),
            )
            .text("user_email", metadata.user_email.clone().unwrap_or_default())
            .text("name", metadata.title.clone().unwrap_or_default())
            .text("description", metadata.description.clone().unwrap_or_default());

        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        let status = response.status();
        debug!(
            status = %status,
            latency_ms = start.elapsed().as_millis() as u64,
            "Matching service responded"
        );

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(MatchError::Remote {
                status: status.as_u16(),
                message: remote_message(&body),
            });
        }

        response
            .json::<MatchResponse>()
            .await
            .map_err(|e| MatchError::Decode(e.to_string()))
    }

    fn classify_send_error(&self, e: reqwest::Error) -> MatchError {
        if e.is_timeout() {
            MatchError::Timeout(self.timeout)
        } else {
            MatchError::Transport(e.to_string())
        }
    }
}

/// Prefer the structured `error` field, fall back to the raw body.
fn remote_message(body: &str) -> String {
    serde_json::from_str::<RemoteErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_string())
}
