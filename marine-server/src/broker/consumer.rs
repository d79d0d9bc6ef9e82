//! Detection event consumer
//!
//! A single long-lived loop reads one frame at a time and records
//! `PiracyFound` events as piracy cases:
//! - parse failures are logged and dropped, and the position advances
//! - inserts the store refuses for good (unknown video, invalid score) are
//!   logged and dropped the same way
//! - transient insert failures rewind the partition to the failed frame and
//!   read it again after the retry interval, so no later position is stored
//!   past it
//! - read failures sleep for the retry interval and read again
//!
//! Redelivered frames hit the (video, url, score) uniqueness constraint and
//! come back as duplicates, so replay does not create extra rows.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use marine_core::DetectionEvent;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::Offset;

use super::{BrokerError, Frame, FrameSource};
use crate::db::{InsertOutcome, NewPiracyCase, Store};

/// Upper bound on a partition seek
const SEEK_TIMEOUT: Duration = Duration::from_secs(5);

/// Kafka consumer-group member reading a single topic.
pub struct KafkaFrameSource {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaFrameSource {
    pub fn new(brokers: &str, group_id: &str, topic: &str) -> Result<Self, BrokerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "true")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", "earliest")
            .create()?;

        consumer.subscribe(&[topic])?;

        tracing::info!(brokers = %brokers, group_id = %group_id, topic = %topic, "Kafka consumer subscribed");

        Ok(Self {
            consumer,
            topic: topic.to_string(),
        })
    }
}

#[async_trait]
impl FrameSource for KafkaFrameSource {
    async fn next_frame(&self) -> Result<Frame, BrokerError> {
        let message = self.consumer.recv().await?;
        let payload = message
            .payload()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default();

        Ok(Frame {
            payload,
            partition: message.partition(),
            offset: message.offset(),
        })
    }

    fn commit(&self, frame: &Frame) -> Result<(), BrokerError> {
        // The stored offset is the next one to read.
        self.consumer
            .store_offset(&self.topic, frame.partition, frame.offset + 1)?;
        Ok(())
    }

    fn rewind(&self, frame: &Frame) -> Result<(), BrokerError> {
        self.consumer.seek(
            &self.topic,
            frame.partition,
            Offset::Offset(frame.offset),
            SEEK_TIMEOUT,
        )?;
        Ok(())
    }
}

/// What happened to one frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// A piracy case was written with this id
    Recorded(i64),
    /// The same detection was already recorded
    Duplicate,
    /// Not a piracy detection (other event type or foreign producer)
    Ignored,
    /// Recognized but malformed; dropped
    Malformed(String),
    /// The store refused the case for good; dropped
    Rejected(String),
    /// The insert failed transiently; the frame is read again
    InsertFailed(String),
}

impl FrameOutcome {
    /// Whether the source position may advance past this frame.
    pub fn should_commit(&self) -> bool {
        !matches!(self, Self::InsertFailed(_))
    }
}

/// Turns detection frames into piracy cases.
pub struct DetectionConsumer {
    source: Arc<dyn FrameSource>,
    store: Arc<dyn Store>,
    retry_interval: Duration,
}

impl DetectionConsumer {
    pub fn new(
        source: Arc<dyn FrameSource>,
        store: Arc<dyn Store>,
        retry_interval: Duration,
    ) -> Self {
        Self {
            source,
            store,
            retry_interval,
        }
    }

    /// Handle one frame payload.
    pub async fn process_frame(&self, payload: &str) -> FrameOutcome {
        let event = match DetectionEvent::try_decode(payload) {
            Ok(Some(event)) => event,
            Ok(None) => {
                tracing::debug!(payload = %payload, "Ignoring unrecognized frame");
                return FrameOutcome::Ignored;
            }
            Err(e) => {
                tracing::warn!(payload = %payload, error = %e, "Dropping malformed frame");
                return FrameOutcome::Malformed(e.to_string());
            }
        };

        let DetectionEvent::PiracyFound {
            video_id,
            url,
            score,
        } = event
        else {
            return FrameOutcome::Ignored;
        };

        let case = NewPiracyCase {
            video_id,
            piracy_url: url,
            match_score: score,
        };

        match self.store.insert_piracy_case(case).await {
            Ok(InsertOutcome::Inserted(id)) => {
                tracing::info!(case_id = id, video_id, score, "Piracy case recorded");
                FrameOutcome::Recorded(id)
            }
            Ok(InsertOutcome::Duplicate) => {
                tracing::debug!(video_id, score, "Piracy case already recorded");
                FrameOutcome::Duplicate
            }
            Err(e) if e.is_transient() => {
                tracing::error!(video_id, error = %e, "Failed to record piracy case, will retry");
                FrameOutcome::InsertFailed(e.to_string())
            }
            Err(e) => {
                tracing::warn!(video_id, error = %e, "Dropping rejected piracy case");
                FrameOutcome::Rejected(e.to_string())
            }
        }
    }

    /// Consume frames until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!("Detection consumer started");

        loop {
            let next = tokio::select! {
                _ = &mut shutdown => break,
                next = self.source.next_frame() => next,
            };

            match next {
                Ok(frame) => {
                    let outcome = self.process_frame(&frame.payload).await;
                    if outcome.should_commit() {
                        if let Err(e) = self.source.commit(&frame) {
                            tracing::warn!(
                                partition = frame.partition,
                                offset = frame.offset,
                                error = %e,
                                "Failed to store consumer position"
                            );
                        }
                        continue;
                    }

                    if let Err(e) = self.source.rewind(&frame) {
                        tracing::error!(
                            partition = frame.partition,
                            offset = frame.offset,
                            error = %e,
                            "Failed to rewind to uncommitted frame"
                        );
                    }
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(self.retry_interval) => {}
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        retry_in_ms = self.retry_interval.as_millis() as u64,
                        "Broker read failed"
                    );
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(self.retry_interval) => {}
                    }
                }
            }
        }

        tracing::info!("Detection consumer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, NewVideo, PiracyCase, StoreError, Video};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use parking_lot::Mutex;
    use rdkafka::error::KafkaError;
    use std::collections::VecDeque;

    /// Replays a fixed script, then waits forever.
    #[derive(Default)]
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<Frame, BrokerError>>>,
        committed: Mutex<Vec<i64>>,
        rewound: Mutex<Vec<i64>>,
    }

    impl ScriptedSource {
        fn new(payloads: &[&str]) -> Self {
            let script = payloads
                .iter()
                .enumerate()
                .map(|(i, p)| Ok(frame(i as i64, p)))
                .collect();
            Self {
                script: Mutex::new(script),
                committed: Mutex::default(),
                rewound: Mutex::default(),
            }
        }

        fn remaining(&self) -> usize {
            self.script.lock().len()
        }
    }

    fn frame(offset: i64, payload: &str) -> Frame {
        Frame {
            payload: payload.to_string(),
            partition: 0,
            offset,
        }
    }

    #[async_trait]
    impl FrameSource for ScriptedSource {
        async fn next_frame(&self) -> Result<Frame, BrokerError> {
            let next = self.script.lock().pop_front();
            match next {
                Some(item) => item,
                None => futures::future::pending().await,
            }
        }

        fn commit(&self, frame: &Frame) -> Result<(), BrokerError> {
            self.committed.lock().push(frame.offset);
            Ok(())
        }

        fn rewind(&self, frame: &Frame) -> Result<(), BrokerError> {
            self.rewound.lock().push(frame.offset);
            self.script.lock().push_front(Ok(frame.clone()));
            Ok(())
        }
    }

    /// Memory store whose first `failures` piracy inserts fail transiently.
    struct FlakyStore {
        inner: Arc<MemoryStore>,
        failures: AtomicUsize,
    }

    impl FlakyStore {
        fn new(inner: Arc<MemoryStore>, failures: usize) -> Self {
            Self {
                inner,
                failures: AtomicUsize::new(failures),
            }
        }
    }

    #[async_trait]
    impl Store for FlakyStore {
        async fn insert_video(&self, input: NewVideo) -> Result<i64, StoreError> {
            self.inner.insert_video(input).await
        }

        async fn find_video(&self, id: i64) -> Result<Option<Video>, StoreError> {
            self.inner.find_video(id).await
        }

        async fn list_videos_for_user(&self, user_email: &str) -> Result<Vec<Video>, StoreError> {
            self.inner.list_videos_for_user(user_email).await
        }

        async fn mark_flagged(&self, id: i64) -> Result<bool, StoreError> {
            self.inner.mark_flagged(id).await
        }

        async fn insert_piracy_case(
            &self,
            input: NewPiracyCase,
        ) -> Result<InsertOutcome, StoreError> {
            let failing = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(StoreError::Connection("pool timed out".into()));
            }
            self.inner.insert_piracy_case(input).await
        }

        async fn list_piracy_cases(&self) -> Result<Vec<PiracyCase>, StoreError> {
            self.inner.list_piracy_cases().await
        }

        async fn check_health(&self) -> Result<(), StoreError> {
            self.inner.check_health().await
        }
    }

    async fn store_with_videos(count: usize) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for i in 0..count {
            store
                .insert_video(NewVideo {
                    filename: format!("video-{}.mp4", i + 1),
                    fingerprint: marine_core::fingerprint(&[i as u8]),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        store
    }

    fn consumer(source: Arc<ScriptedSource>, store: Arc<MemoryStore>) -> DetectionConsumer {
        DetectionConsumer::new(source, store, Duration::from_millis(10))
    }

    /// Run the consumer until the script is exhausted.
    async fn drive(source: Arc<ScriptedSource>, store: Arc<MemoryStore>) {
        let watched = source.clone();
        let shutdown = async move {
            while watched.remaining() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            // Let the last frame finish processing.
            tokio::time::sleep(Duration::from_millis(50)).await;
        };
        consumer(source, store).run_until(shutdown).await;
    }

    #[tokio::test]
    async fn test_piracy_found_frame_records_case() {
        let store = store_with_videos(42).await;
        let source = Arc::new(ScriptedSource::default());
        let consumer = consumer(source, store.clone());

        let outcome = consumer
            .process_frame("PiracyFound:42:https://pirate.example/x:91.5")
            .await;
        assert!(matches!(outcome, FrameOutcome::Recorded(_)));

        let cases = store.list_piracy_cases().await.unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].video_id, 42);
        assert_eq!(cases[0].piracy_url, "https://pirate.example/x");
        assert_eq!(cases[0].match_score, 91.5);
    }

    #[tokio::test]
    async fn test_json_frame_records_case() {
        let store = store_with_videos(1).await;
        let consumer = consumer(Arc::new(ScriptedSource::default()), store.clone());

        let outcome = consumer
            .process_frame(r#"{"type":"piracy_found","video_id":1,"url":"https://p.example/a","score":88.0}"#)
            .await;
        assert_eq!(outcome, FrameOutcome::Recorded(1));
    }

    #[tokio::test]
    async fn test_malformed_frames_insert_nothing() {
        let store = store_with_videos(1).await;
        let consumer = consumer(Arc::new(ScriptedSource::default()), store.clone());

        for payload in [
            "PiracyFound:abc:url:10",
            "PiracyFound:1:onlytwo",
            "PiracyFound:1:https://p.example/a:NaN",
            "PiracyFound:1:https://p.example/a:140",
            r#"{"type":"piracy_found","video_id":1}"#,
        ] {
            let outcome = consumer.process_frame(payload).await;
            assert!(matches!(outcome, FrameOutcome::Malformed(_)), "{}", payload);
            assert!(outcome.should_commit());
        }
        assert_eq!(store.piracy_case_count(), 0);
    }

    #[tokio::test]
    async fn test_foreign_and_upload_frames_are_ignored() {
        let store = store_with_videos(1).await;
        let consumer = consumer(Arc::new(ScriptedSource::default()), store.clone());

        assert_eq!(consumer.process_frame("hello world").await, FrameOutcome::Ignored);
        assert_eq!(consumer.process_frame("VideoUploaded:1").await, FrameOutcome::Ignored);
        assert_eq!(store.piracy_case_count(), 0);
    }

    #[tokio::test]
    async fn test_redelivered_frame_is_duplicate() {
        let store = store_with_videos(1).await;
        let consumer = consumer(Arc::new(ScriptedSource::default()), store.clone());
        let payload = "PiracyFound:1:https://p.example/a:90";

        assert_eq!(consumer.process_frame(payload).await, FrameOutcome::Recorded(1));
        assert_eq!(consumer.process_frame(payload).await, FrameOutcome::Duplicate);
        assert_eq!(store.piracy_case_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_video_is_rejected() {
        let store = store_with_videos(0).await;
        let consumer = consumer(Arc::new(ScriptedSource::default()), store.clone());

        let outcome = consumer
            .process_frame("PiracyFound:7:https://p.example/a:90")
            .await;
        assert!(matches!(outcome, FrameOutcome::Rejected(_)));
        assert!(outcome.should_commit());
    }

    #[tokio::test]
    async fn test_transient_store_error_is_insert_failure() {
        let store = Arc::new(FlakyStore::new(store_with_videos(1).await, 1));
        let consumer = DetectionConsumer::new(
            Arc::new(ScriptedSource::default()),
            store,
            Duration::from_millis(10),
        );

        let outcome = consumer
            .process_frame("PiracyFound:1:https://p.example/a:90")
            .await;
        assert!(matches!(outcome, FrameOutcome::InsertFailed(_)));
        assert!(!outcome.should_commit());
    }

    #[tokio::test]
    async fn test_loop_continues_past_bad_frames_and_commits_handled_ones() {
        let store = store_with_videos(42).await;
        let source = Arc::new(ScriptedSource::new(&[
            "PiracyFound:abc:url:10",
            "PiracyFound:1:onlytwo",
            "PiracyFound:42:https://pirate.example/x:91.5",
            "PiracyFound:99:https://pirate.example/y:91.5",
            "VideoUploaded:3",
        ]));

        drive(source.clone(), store.clone()).await;

        let cases = store.list_piracy_cases().await.unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].video_id, 42);
        // Offset 3 referenced a missing video: rejected and dropped.
        assert_eq!(*source.committed.lock(), vec![0, 1, 2, 3, 4]);
        assert!(source.rewound.lock().is_empty());
    }

    #[tokio::test]
    async fn test_loop_retries_after_read_error() {
        let store = store_with_videos(1).await;
        let source = Arc::new(ScriptedSource::default());
        {
            let mut script = source.script.lock();
            script.push_back(Err(BrokerError::Kafka(KafkaError::NoMessageReceived)));
            script.push_back(Err(BrokerError::Kafka(KafkaError::NoMessageReceived)));
            script.push_back(Ok(frame(0, "PiracyFound:1:https://p.example/a:99.9")));
        }

        drive(source.clone(), store.clone()).await;

        assert_eq!(store.piracy_case_count(), 1);
        assert_eq!(*source.committed.lock(), vec![0]);
    }

    #[tokio::test]
    async fn test_transient_insert_failure_rereads_frame_before_moving_on() {
        let inner = store_with_videos(1).await;
        let store = Arc::new(FlakyStore::new(inner.clone(), 2));
        let source = Arc::new(ScriptedSource::new(&[
            "PiracyFound:1:https://p.example/a:90",
            "PiracyFound:1:https://p.example/b:95",
        ]));
        let consumer =
            DetectionConsumer::new(source.clone(), store, Duration::from_millis(10));

        let watched = inner.clone();
        let shutdown = async move {
            while watched.piracy_case_count() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        };
        tokio::time::timeout(Duration::from_secs(2), consumer.run_until(shutdown))
            .await
            .expect("both frames should be recorded");

        // Offset 1 is never stored while offset 0 is still pending.
        assert_eq!(*source.rewound.lock(), vec![0, 0]);
        assert_eq!(*source.committed.lock(), vec![0, 1]);

        let urls: Vec<_> = inner
            .list_piracy_cases()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.piracy_url)
            .collect();
        assert_eq!(urls, vec!["https://p.example/b", "https://p.example/a"]);
    }

    #[tokio::test]
    async fn test_shutdown_stops_idle_loop() {
        let store = store_with_videos(0).await;
        let consumer = consumer(Arc::new(ScriptedSource::default()), store);

        tokio::time::timeout(Duration::from_secs(1), consumer.run_until(async {}))
            .await
            .expect("consumer should stop on shutdown");
    }
}
