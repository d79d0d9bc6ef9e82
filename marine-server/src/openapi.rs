//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3 document for the Marine API.

use utoipa::OpenApi;

use crate::db::{PiracyCaseRecord, VideoRecord};
use crate::handlers::{
    HealthResponse, ReadyResponse, StartCrawlingResponse, SubmitRequest, SubmitResponse,
    UploadResponse,
};

/// Marine API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Marine - Piracy Tracking API",
        version = "0.1.0",
        description = r#"
## Video Piracy Tracking API

Marine records uploaded videos and tracks copies of them found elsewhere:

- **Upload** a video via `POST /upload`; it is stored, fingerprinted (MD5) and recorded
- Matching and discovery services are notified in the background
- Piracy detections arrive over Kafka and appear under `GET /reports`
- Dashboards follow live detections via `GET /sse`
- Suspicious URLs are batched for crawling via `/crawler/submit` and `/crawler/start`
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    tags(
        (name = "Videos", description = "Upload and look up videos"),
        (name = "Reports", description = "Recorded piracy cases"),
        (name = "Crawler", description = "Batch URLs for crawling"),
        (name = "Dashboard", description = "Live detection stream"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::upload::upload_handler,
        crate::handlers::reports::get_video_handler,
        crate::handlers::reports::list_user_videos_handler,
        crate::handlers::reports::list_reports_handler,
        crate::handlers::crawler::submit_url_handler,
        crate::handlers::crawler::start_crawling_handler,
        crate::handlers::stream::stream_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            UploadResponse,
            VideoRecord,
            PiracyCaseRecord,
            SubmitRequest,
            SubmitResponse,
            StartCrawlingResponse,
        )
    )
)]
pub struct ApiDoc;
