//! Shared helpers for marine-server integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use marine_core::DetectionEvent;
use marine_server::{
    create_router, AppState, BrokerError, Config, EventPublisher, InsertOutcome, MemoryStore,
    NewPiracyCase, NewVideo, PiracyCase, Store, StoreError, Video,
};
use parking_lot::Mutex;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Nothing listens on the discard port, so connections are refused.
pub const UNREACHABLE: &str = "http://127.0.0.1:9";

pub const BOUNDARY: &str = "----TestBoundary7MA4YWxkTrZu0gW";

/// Publisher that keeps every event in memory.
#[derive(Default)]
pub struct RecordingPublisher {
    pub events: Mutex<Vec<DetectionEvent>>,
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &DetectionEvent) -> Result<(), BrokerError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Store whose every statement fails as if the database were down.
pub struct UnavailableStore;

fn down<T>() -> Result<T, StoreError> {
    Err(StoreError::Connection("connection refused".into()))
}

#[async_trait]
impl Store for UnavailableStore {
    async fn insert_video(&self, _input: NewVideo) -> Result<i64, StoreError> {
        down()
    }

    async fn find_video(&self, _id: i64) -> Result<Option<Video>, StoreError> {
        down()
    }

    async fn list_videos_for_user(&self, _user_email: &str) -> Result<Vec<Video>, StoreError> {
        down()
    }

    async fn mark_flagged(&self, _id: i64) -> Result<bool, StoreError> {
        down()
    }

    async fn insert_piracy_case(
        &self,
        _input: NewPiracyCase,
    ) -> Result<InsertOutcome, StoreError> {
        down()
    }

    async fn list_piracy_cases(&self) -> Result<Vec<PiracyCase>, StoreError> {
        down()
    }

    async fn check_health(&self) -> Result<(), StoreError> {
        down()
    }
}

/// Router backed by [`UnavailableStore`], with its uploads directory.
pub fn unavailable_app() -> (Router, TempDir) {
    let uploads = tempfile::tempdir().unwrap();
    let config = Config {
        uploads_dir: uploads.path().to_path_buf(),
        ai_service_url: UNREACHABLE.to_string(),
        discovery_service_url: UNREACHABLE.to_string(),
        detection_stream_url: UNREACHABLE.to_string(),
        ..Config::default()
    };
    let state = AppState::from_config(
        &config,
        Arc::new(UnavailableStore),
        Arc::new(RecordingPublisher::default()),
    )
    .unwrap();
    (create_router(state, &config), uploads)
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub publisher: Arc<RecordingPublisher>,
    pub uploads: TempDir,
}

impl TestApp {
    /// App with every collaborator unreachable unless `configure` says otherwise.
    pub fn new(configure: impl FnOnce(&mut Config)) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let mut config = Config {
            uploads_dir: uploads.path().to_path_buf(),
            ai_service_url: UNREACHABLE.to_string(),
            discovery_service_url: UNREACHABLE.to_string(),
            detection_stream_url: UNREACHABLE.to_string(),
            ..Config::default()
        };
        configure(&mut config);

        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let state = AppState::from_config(&config, store.clone(), publisher.clone()).unwrap();
        let router = create_router(state.clone(), &config);

        Self {
            router,
            state,
            store,
            publisher,
            uploads,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> axum::response::Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> axum::response::Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

/// One multipart file part plus optional text fields.
pub fn upload_multipart(
    filename: &str,
    content_type: &str,
    content: &[u8],
    fields: &[(&str, &str)],
) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(b"\r\n");

    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

pub fn upload_request(content_type: String, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap()
}

pub async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    check()
}
