//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod crawler;
pub mod health;
pub mod reports;
pub mod stream;
pub mod upload;

pub use crate::state::AppState;
pub use crawler::{
    start_crawling_handler, submit_url_handler, StartCrawlingResponse, SubmitRequest,
    SubmitResponse,
};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use reports::{get_video_handler, list_reports_handler, list_user_videos_handler};
pub use stream::{stream_handler, StreamQuery};
pub use upload::{upload_handler, UploadResponse};
