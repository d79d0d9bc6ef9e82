//! Broker integration
//!
//! Detection events share one Kafka topic:
//! - **Producer**: announces uploads (`VideoUploaded`), one attempt, `acks=all`.
//! - **Consumer**: records `PiracyFound` frames as piracy cases, storing its
//!   position only once a frame has been handled and rewinding to frames
//!   whose insert must be retried.
//!
//! Both sides sit behind traits so the loop can be driven without a broker.

pub mod consumer;
pub mod producer;

pub use consumer::{DetectionConsumer, FrameOutcome, KafkaFrameSource};
pub use producer::KafkaPublisher;

use async_trait::async_trait;
use marine_core::DetectionEvent;
use rdkafka::error::KafkaError;
use thiserror::Error;

/// Broker errors
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),
}

/// One frame read from the topic, detached from the client's buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub payload: String,
    pub partition: i32,
    pub offset: i64,
}

/// Publishes detection events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DetectionEvent) -> Result<(), BrokerError>;
}

/// Sequential source of frames with manual position tracking.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Wait for the next frame.
    async fn next_frame(&self) -> Result<Frame, BrokerError>;

    /// Mark `frame` as handled so the group resumes after it.
    fn commit(&self, frame: &Frame) -> Result<(), BrokerError>;

    /// Move the frame's partition back so `frame` is the next one read.
    ///
    /// Positions are cumulative per partition: committing any later frame
    /// would also cover this one, so a frame that must be retried is rewound
    /// instead of skipped.
    fn rewind(&self, frame: &Frame) -> Result<(), BrokerError>;
}
