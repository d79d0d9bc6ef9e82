//! Post-upload fanout
//!
//! Once an upload is ingested, three independent jobs are scheduled:
//! matching, discovery forwarding and the upload announcement. They share no
//! state, run in no particular order, and report nothing back to the caller.

use std::sync::Arc;

use marine_core::{DetectionEvent, Verdict, VerdictPolicy};
use tokio::task::JoinHandle;

use super::Dispatcher;
use crate::broker::EventPublisher;
use crate::clients::{DiscoveryClient, MatchingClient};
use crate::db::Store;
use crate::ingest::IngestedVideo;

/// Schedules background work for freshly ingested uploads.
#[derive(Clone)]
pub struct DispatchFanout {
    dispatcher: Dispatcher,
    matching: MatchingClient,
    discovery: DiscoveryClient,
    publisher: Arc<dyn EventPublisher>,
    store: Arc<dyn Store>,
    policy: VerdictPolicy,
}

impl DispatchFanout {
    pub fn new(
        dispatcher: Dispatcher,
        matching: MatchingClient,
        discovery: DiscoveryClient,
        publisher: Arc<dyn EventPublisher>,
        store: Arc<dyn Store>,
        policy: VerdictPolicy,
    ) -> Self {
        Self {
            dispatcher,
            matching,
            discovery,
            publisher,
            store,
            policy,
        }
    }

    /// Schedule the jobs for `video` and return immediately.
    pub fn schedule(&self, video: &IngestedVideo) -> Vec<JoinHandle<()>> {
        vec![
            self.dispatcher.spawn("matching", self.matching_job(video.clone())),
            self.dispatcher.spawn("discovery", self.discovery_job(video.clone())),
            self.dispatcher.spawn("announce", self.announce_job(video.id)),
        ]
    }

    fn matching_job(&self, video: IngestedVideo) -> impl std::future::Future<Output = ()> + Send {
        let matching = self.matching.clone();
        let store = self.store.clone();
        let policy = self.policy.clone();

        async move {
            let response = match matching.match_video(&video.path, &video.metadata).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(video_id = video.id, error = %e, "Matching failed");
                    return;
                }
            };

            if let Some(frame) = &response.kafka_message {
                tracing::debug!(video_id = video.id, frame = %frame, "Matching service emitted a frame");
            }

            match policy.classify(response.match_score, &video.filename) {
                Verdict::Piracy { score, report_url } => {
                    tracing::warn!(
                        video_id = video.id,
                        score,
                        report_url = %report_url,
                        "Piracy detected"
                    );
                    match store.mark_flagged(video.id).await {
                        Ok(true) => {}
                        Ok(false) => {
                            tracing::warn!(video_id = video.id, "Flagged video no longer exists")
                        }
                        Err(e) => {
                            tracing::error!(video_id = video.id, error = %e, "Failed to flag video")
                        }
                    }
                }
                Verdict::Clean { score } => {
                    tracing::info!(video_id = video.id, score, "No piracy detected");
                }
            }
        }
    }

    fn discovery_job(&self, video: IngestedVideo) -> impl std::future::Future<Output = ()> + Send {
        let discovery = self.discovery.clone();

        async move {
            match discovery.forward(&video.path, &video.metadata).await {
                Ok(()) => tracing::info!(video_id = video.id, "Forwarded to discovery"),
                Err(e) => {
                    tracing::warn!(video_id = video.id, error = %e, "Discovery forward failed")
                }
            }
        }
    }

    fn announce_job(&self, video_id: i64) -> impl std::future::Future<Output = ()> + Send {
        let publisher = self.publisher.clone();

        async move {
            let event = DetectionEvent::VideoUploaded { video_id };
            if let Err(e) = publisher.publish(&event).await {
                tracing::warn!(video_id, error = %e, "Failed to announce upload");
            }
        }
    }
}
