//! Router configuration module
//!
//! Configures all routes, middleware layers, and creates the application router.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode},
    routing::{get, post},
    Router,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::handlers::{
    get_video_handler, health, list_reports_handler, list_user_videos_handler, ready,
    start_crawling_handler, stream_handler, submit_url_handler, upload_handler,
};
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Create the application router
///
/// Rate limiting needs the peer address: serve with
/// `into_make_service_with_connect_info::<SocketAddr>()` when it is enabled.
pub fn create_router(state: AppState, config: &Config) -> Router {
    let cors = match &config.allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            tracing::info!("CORS: Restricting to {} origin(s)", origins.len());
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        }
        _ => {
            tracing::warn!("CORS: Allowing all origins (dev mode)");
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    let body_limit_bytes = config.body_limit_mb * 1024 * 1024;
    let body_limit = RequestBodyLimitLayer::new(body_limit_bytes);

    let timeout = TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.timeout_secs),
    );

    // The event stream is open-ended, so it stays outside the request timeout.
    let streaming = Router::new().route("/sse", get(stream_handler));

    let api = Router::new()
        .route("/upload", post(upload_handler))
        .route("/crawler/submit", post(submit_url_handler))
        .route(
            "/crawler/start",
            post(start_crawling_handler).get(start_crawling_handler),
        )
        .route("/reports", get(list_reports_handler))
        .route("/videos/{id}", get(get_video_handler))
        .route("/users/{user_email}/videos", get(list_user_videos_handler))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .layer(timeout);

    let router = Router::new()
        .merge(api)
        .merge(streaming)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        // Extractors default to 2 MB; lift that to the configured limit.
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(cors)
        .layer(body_limit);

    if config.rate_limit_enabled {
        let governor_conf = GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_sec)
            .burst_size(config.rate_limit_burst)
            .finish();

        if let Some(governor_conf) = governor_conf {
            tracing::info!(
                "Rate limiting: {} req/s (burst: {})",
                config.rate_limit_per_sec,
                config.rate_limit_burst
            );

            return router
                .layer(GovernorLayer::new(Arc::new(governor_conf)))
                .layer(TraceLayer::new_for_http());
        }

        tracing::error!(
            per_sec = config.rate_limit_per_sec,
            burst = config.rate_limit_burst,
            "Invalid rate limit settings, rate limiting DISABLED"
        );
    } else {
        tracing::warn!("Rate limiting: DISABLED");
    }

    router.layer(TraceLayer::new_for_http())
}
