//! Crawl batching handlers
//!
//! URLs are queued by POST /crawler/submit and drained as one batch by
//! /crawler/start. When a crawler service is configured the drained batch is
//! forwarded to it in the background.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::validate_crawl_url;

/// Request body for URL submission
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitRequest {
    #[serde(default)]
    #[schema(example = "https://pirate.example/watch?v=1")]
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitResponse {
    pub message: String,
    /// Queue length after this submission
    pub queued: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StartCrawlingResponse {
    #[schema(example = "Started crawling 2 URLs.")]
    pub message: String,
    pub count: usize,
    /// The drained batch, in submission order
    pub urls: Vec<String>,
}

/// Queue a URL for the next crawl
#[utoipa::path(
    post,
    path = "/crawler/submit",
    tag = "Crawler",
    request_body = SubmitRequest,
    responses(
        (status = 200, description = "URL queued", body = SubmitResponse),
        (status = 400, description = "Missing or invalid url")
    )
)]
pub async fn submit_url_handler(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let url = validate_crawl_url(&request.url)?;
    let queued = state.queue.submit(url.clone());

    tracing::info!(url = %url, queued, "URL queued for crawling");

    Ok(Json(SubmitResponse {
        message: format!("URL {} submitted for crawling.", url),
        queued,
    }))
}

/// Drain the queue and start crawling the batch
///
/// Served for both GET and POST.
#[utoipa::path(
    method(get, post),
    path = "/crawler/start",
    tag = "Crawler",
    responses(
        (status = 200, description = "Batch drained", body = StartCrawlingResponse),
        (status = 400, description = "No URLs submitted")
    )
)]
pub async fn start_crawling_handler(
    State(state): State<AppState>,
) -> Result<Json<StartCrawlingResponse>, ApiError> {
    let urls = state.queue.drain()?;
    let count = urls.len();

    tracing::info!(count, "Crawl batch drained");

    if let Some(crawler) = state.crawler.clone() {
        let batch = urls.clone();
        state.dispatcher.spawn("crawler", async move {
            if let Err(e) = crawler.forward_batch(&batch).await {
                tracing::warn!(count = batch.len(), error = %e, "Crawler forward failed");
            }
        });
    }

    Ok(Json(StartCrawlingResponse {
        message: format!("Started crawling {} URLs.", count),
        count,
        urls,
    }))
}
