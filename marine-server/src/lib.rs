//! Marine Server Library - upload intake, detection dispatch and broker consumer
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.

pub mod broker;
pub mod clients;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod multipart;
pub mod openapi;
pub mod relay;
pub mod routes;
pub mod state;
pub mod validation;

pub use broker::{
    BrokerError, DetectionConsumer, EventPublisher, Frame, FrameOutcome, FrameSource,
    KafkaFrameSource, KafkaPublisher,
};
pub use clients::{CrawlerClient, DiscoveryClient, MatchError, MatchResponse, MatchingClient};
pub use config::{Config, ConfigError};
pub use db::{
    InsertOutcome, MemoryStore, NewPiracyCase, NewVideo, PgStore, PiracyCase, PiracyCaseRecord,
    Store, StoreError, Video, VideoRecord,
};
pub use dispatch::{DispatchFanout, Dispatcher};
pub use error::ApiError;
pub use ingest::{IngestError, IngestedVideo, UploadIntake, VideoMetadata};
pub use openapi::ApiDoc;
pub use relay::{LiveEventRelay, RelayError};
pub use routes::create_router;
pub use state::AppState;
