//! Application state module
//!
//! Defines shared state accessible across all request handlers. Every piece
//! is owned by the server instance; nothing is process-global.

use std::sync::Arc;

use marine_core::{MarineError, SubmissionQueue};

use crate::broker::EventPublisher;
use crate::clients::{CrawlerClient, DiscoveryClient, MatchingClient};
use crate::config::Config;
use crate::db::Store;
use crate::dispatch::{DispatchFanout, Dispatcher};
use crate::ingest::UploadIntake;
use crate::relay::LiveEventRelay;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Video and piracy case storage
    pub store: Arc<dyn Store>,
    /// Writes, fingerprints and records uploads
    pub intake: Arc<UploadIntake>,
    /// Schedules background work after an upload
    pub fanout: DispatchFanout,
    /// Bounded spawner shared by all background jobs
    pub dispatcher: Dispatcher,
    /// URLs waiting for the next crawl
    pub queue: Arc<SubmissionQueue>,
    /// Detection stream relay for dashboards
    pub relay: LiveEventRelay,
    /// Crawler forwarding target, when configured
    pub crawler: Option<CrawlerClient>,
    /// Maximum accepted upload size in bytes
    pub max_file_size: usize,
}

impl AppState {
    /// Wire up state from configuration.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn Store>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Result<Self, MarineError> {
        let dispatcher = Dispatcher::new(config.dispatch_max_in_flight);

        let matching = MatchingClient::new(&config.ai_service_url, config.match_timeout)
            .map_err(MarineError::from)?;
        let discovery = DiscoveryClient::new(&config.discovery_service_url)
            .map_err(|e| MarineError::Transport(e.to_string()))?;
        let relay = LiveEventRelay::new(&config.detection_stream_url)
            .map_err(|e| MarineError::Transport(e.to_string()))?;
        let crawler = config
            .crawler_service_url
            .as_deref()
            .map(CrawlerClient::new)
            .transpose()
            .map_err(|e| MarineError::Transport(e.to_string()))?;

        let fanout = DispatchFanout::new(
            dispatcher.clone(),
            matching,
            discovery,
            publisher,
            store.clone(),
            config.verdict_policy(),
        );

        Ok(Self {
            intake: Arc::new(UploadIntake::new(&config.uploads_dir, store.clone())),
            store,
            fanout,
            dispatcher,
            queue: Arc::new(SubmissionQueue::new()),
            relay,
            crawler,
            max_file_size: config.max_file_size(),
        })
    }
}
