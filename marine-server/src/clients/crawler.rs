//! Crawler service client
//!
//! Forwards a drained submission batch: one `POST {base}/submit` per URL,
//! then `GET {base}/start_crawling`.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

const CRAWLER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Crawler service unreachable: {0}")]
    Transport(String),

    #[error("Crawler {endpoint} returned {status}")]
    Status { endpoint: &'static str, status: u16 },
}

#[derive(Serialize)]
struct SubmitBody<'a> {
    url: &'a str,
}

#[derive(Clone)]
pub struct CrawlerClient {
    client: Client,
    base_url: String,
}

impl CrawlerClient {
    pub fn new(base_url: &str) -> Result<Self, CrawlerError> {
        let client = Client::builder()
            .timeout(CRAWLER_TIMEOUT)
            .build()
            .map_err(|e| CrawlerError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Submit every URL in order, then trigger a crawl. Stops at the first failure.
    pub async fn forward_batch(&self, urls: &[String]) -> Result<(), CrawlerError> {
        for url in urls {
            let response = self
                .client
                .post(format!("{}/submit", self.base_url))
                .json(&SubmitBody { url })
                .send()
                .await
                .map_err(|e| CrawlerError::Transport(e.to_string()))?;

            if !response.status().is_success() {
                return Err(CrawlerError::Status {
                    endpoint: "/submit",
                    status: response.status().as_u16(),
                });
            }
        }

        let response = self
            .client
            .get(format!("{}/start_crawling", self.base_url))
            .send()
            .await
            .map_err(|e| CrawlerError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CrawlerError::Status {
                endpoint: "/start_crawling",
                status: response.status().as_u16(),
            });
        }

        tracing::info!(count = urls.len(), "Crawl batch forwarded");
        Ok(())
    }
}
