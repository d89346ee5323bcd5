//! Kafka queue transport.
//!
//! The payload is published as-is; the attempt counter travels in the
//! `x-rebalance-attempt` header so re-queued messages keep their bytes.
//!
//! The consumer stores an offset only when the message is acknowledged, so
//! a message whose handling was interrupted is consumed again after restart.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{Header, Headers, Message, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;

use crate::application::ports::{Envelope, QueueConsumerPort, QueuePublisherPort, TransportError};

/// Header carrying the attempt counter.
pub const ATTEMPT_HEADER: &str = "x-rebalance-attempt";

/// Parse the attempt header value; absent or garbled means a fresh message.
fn parse_attempt(value: Option<&[u8]>) -> u32 {
    value
        .and_then(|v| std::str::from_utf8(v).ok())
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

/// Offset to commit once the message at `offset` is handled.
const fn next_offset(offset: i64) -> i64 {
    offset + 1
}

/// Position of the last message handed out by `recv`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Position {
    topic: String,
    partition: i32,
    offset: i64,
}

/// Publishes envelopes to one topic.
pub struct KafkaPublisher {
    producer: FutureProducer,
    topic: String,
    timeout: Duration,
}

impl KafkaPublisher {
    /// Create a producer for `topic` on `brokers`.
    pub fn new(brokers: &str, topic: impl Into<String>) -> Result<Self, TransportError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| TransportError::Connection {
                message: e.to_string(),
            })?;

        Ok(Self {
            producer,
            topic: topic.into(),
            timeout: Duration::from_secs(5),
        })
    }
}

#[async_trait]
impl QueuePublisherPort for KafkaPublisher {
    async fn publish(&self, envelope: Envelope) -> Result<(), TransportError> {
        let attempt = envelope.attempt.to_string();
        let headers = OwnedHeaders::new().insert(Header {
            key: ATTEMPT_HEADER,
            value: Some(attempt.as_str()),
        });
        let record = FutureRecord::<(), [u8]>::to(&self.topic)
            .payload(envelope.payload.as_slice())
            .headers(headers);

        self.producer
            .send(record, Timeout::After(self.timeout))
            .await
            .map(|_| ())
            .map_err(|(e, _)| TransportError::Publish {
                message: e.to_string(),
            })
    }
}

/// Consumes envelopes from one topic as part of a consumer group.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    pending: Mutex<Option<Position>>,
}

impl KafkaConsumer {
    /// Join `group_id` on `brokers` and subscribe to `topic`.
    pub fn new(brokers: &str, group_id: &str, topic: &str) -> Result<Self, TransportError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "true")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", "earliest")
            .create()
            .map_err(|e| TransportError::Connection {
                message: e.to_string(),
            })?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| TransportError::Connection {
                message: e.to_string(),
            })?;

        tracing::info!(topic, group_id, "Subscribed to Kafka topic");
        Ok(Self {
            consumer,
            pending: Mutex::new(None),
        })
    }
}

#[async_trait]
impl QueueConsumerPort for KafkaConsumer {
    async fn recv(&self) -> Result<Option<Envelope>, TransportError> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| TransportError::Connection {
                message: e.to_string(),
            })?;

        let attempt = parse_attempt(
            message
                .headers()
                .and_then(|headers| headers.iter().find(|h| h.key == ATTEMPT_HEADER))
                .and_then(|h| h.value),
        );

        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(Position {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
        });

        Ok(Some(Envelope {
            payload: message.payload().unwrap_or_default().to_vec(),
            attempt,
        }))
    }

    async fn ack(&self) -> Result<(), TransportError> {
        let Some(position) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return Ok(());
        };

        self.consumer
            .store_offset(
                &position.topic,
                position.partition,
                next_offset(position.offset),
            )
            .map_err(|e| TransportError::Connection {
                message: e.to_string(),
            })
    }
}
