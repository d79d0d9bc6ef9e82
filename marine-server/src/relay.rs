//! Live event relay
//!
//! Bridges the detection stream's server-sent events for one user to a
//! connected client. Bytes are forwarded verbatim until either side closes.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use reqwest::Client;
use thiserror::Error;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Failures that occur before any byte reaches the client
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Detection stream unreachable: {0}")]
    Connect(String),

    #[error("Detection stream returned {0}")]
    Status(u16),
}

/// Relay to `GET {base}/sse?user_email=...`.
#[derive(Clone)]
pub struct LiveEventRelay {
    client: Client,
    endpoint: String,
}

impl LiveEventRelay {
    pub fn new(base_url: &str) -> Result<Self, RelayError> {
        // No overall timeout: the upstream stream is open-ended.
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| RelayError::Connect(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/sse", base_url.trim_end_matches('/')),
        })
    }

    /// Open the upstream stream for `user_email` and wrap it as a response.
    ///
    /// The streaming headers are set on the returned response; the upstream
    /// body is consumed lazily as the client reads.
    pub async fn open(&self, user_email: &str) -> Result<Response, RelayError> {
        let upstream = self
            .client
            .get(&self.endpoint)
            .query(&[("user_email", user_email)])
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| RelayError::Connect(e.to_string()))?;

        if !upstream.status().is_success() {
            return Err(RelayError::Status(upstream.status().as_u16()));
        }

        tracing::info!(user_email = %user_email, "Relaying detection stream");

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = StatusCode::OK;
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/event-stream"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

        Ok(response)
    }
}
