//! Detection event producer

use std::time::Duration;

use async_trait::async_trait;
use marine_core::{DetectionEvent, FrameFormat};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;

use super::{BrokerError, EventPublisher};

/// Upper bound on waiting for a delivery report
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Kafka-backed publisher.
///
/// Records are unkeyed so the partitioner spreads them across partitions.
/// Each publish is a single attempt with no batching delay.
pub struct KafkaPublisher {
    producer: FutureProducer,
    topic: String,
    format: FrameFormat,
}

impl KafkaPublisher {
    pub fn new(brokers: &str, topic: &str, format: FrameFormat) -> Result<Self, BrokerError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("acks", "all")
            .set("message.send.max.retries", "0")
            .set("linger.ms", "0")
            .set(
                "message.timeout.ms",
                DELIVERY_TIMEOUT.as_millis().to_string(),
            )
            .create()?;

        tracing::info!(brokers = %brokers, topic = %topic, format = ?format, "Kafka producer created");

        Ok(Self {
            producer,
            topic: topic.to_string(),
            format,
        })
    }
}

#[async_trait]
impl EventPublisher for KafkaPublisher {
    async fn publish(&self, event: &DetectionEvent) -> Result<(), BrokerError> {
        let payload = event.encode(self.format);
        let record: FutureRecord<'_, (), str> = FutureRecord::to(&self.topic).payload(payload.as_str());

        self.producer
            .send(record, Timeout::After(DELIVERY_TIMEOUT))
            .await
            .map_err(|(e, _)| BrokerError::Kafka(e))?;

        tracing::debug!(video_id = event.video_id(), topic = %self.topic, "Event published");
        Ok(())
    }
}
