//! The per-topic message-bus consumer (§2 step 2, §5).
//!
//! A [`TopicConsumer`] is a thin wrapper over an `rdkafka` consumer
//! group subscription to exactly one topic. It hands raw record bytes to
//! its caller; decoding into a typed raw event is the codec's job, and
//! mapping decoded events into derived rows is the transformer's job, kept
//! deliberately separate so the consumer stays swappable in tests.

use rdkafka::{
    consumer::{Consumer, StreamConsumer},
    ClientConfig, Message
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("failed to configure or connect to the message bus: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
    #[error("received a tombstone (null-payload) record on topic `{0}`")]
    EmptyPayload(String)
}

/// A single consumed record: the topic it came from and its raw bytes,
/// header included.
#[derive(Debug, Clone)]
pub struct BusRecord {
    pub topic: String,
    pub payload: Vec<u8>
}

/// One subscriber, bound to one topic, inside a shared consumer group.
///
/// Each of the five transformers in §4.2 owns exactly one of these; a
/// transformer is a long-lived single-threaded consumer of one topic and
/// nothing else touches its `StreamConsumer`.
pub struct TopicConsumer {
    topic: String,
    consumer: StreamConsumer
}

impl TopicConsumer {
    pub fn connect(broker_url: &str, group_id: &str, topic: &str) -> Result<Self, BusError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", broker_url)
            .set("group.id", group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .create()?;

        consumer.subscribe(&[topic])?;

        Ok(Self { topic: topic.to_owned(), consumer })
    }

    /// Suspends until the next record for this topic is available
    /// (§5: inbound queue receive is a suspension point).
    pub async fn recv(&self) -> Result<BusRecord, BusError> {
        let message = self.consumer.recv().await?;
        let payload = message
            .payload()
            .ok_or_else(|| BusError::EmptyPayload(self.topic.clone()))?
            .to_vec();

        Ok(BusRecord { topic: self.topic.clone(), payload })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}
