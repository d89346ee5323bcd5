//! Queue Transport Ports (Driven Ports)
//!
//! Publishing and consuming opaque rebalance messages with at-least-once
//! delivery.

use async_trait::async_trait;

/// A message on the rebalance queue.
///
/// `payload` is carried byte-for-byte across re-queues. `attempt` counts
/// failed processing attempts and travels out-of-band (e.g. as a header).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Serialized rebalance request.
    pub payload: Vec<u8>,
    /// Number of earlier failed attempts (0 for a fresh submission).
    pub attempt: u32,
}

impl Envelope {
    /// A fresh message that has never been processed.
    #[must_use]
    pub const fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            attempt: 0,
        }
    }

    /// The same payload marked as the next attempt.
    #[must_use]
    pub fn next_attempt(&self) -> Self {
        Self {
            payload: self.payload.clone(),
            attempt: self.attempt.saturating_add(1),
        }
    }
}

/// Queue transport error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Broker unreachable.
    #[error("queue connection error: {message}")]
    Connection {
        /// Underlying error description.
        message: String,
    },

    /// Broker refused or failed the publish.
    #[error("queue publish failed: {message}")]
    Publish {
        /// Underlying error description.
        message: String,
    },

    /// The transport has been shut down.
    #[error("queue transport closed")]
    Closed,
}

/// Port for publishing messages.
#[async_trait]
pub trait QueuePublisherPort: Send + Sync {
    /// Publish one message.
    async fn publish(&self, envelope: Envelope) -> Result<(), TransportError>;
}

/// Port for pulling messages.
#[async_trait]
pub trait QueueConsumerPort: Send + Sync {
    /// Wait for the next message. `Ok(None)` means the transport is closed
    /// and no more messages will arrive.
    async fn recv(&self) -> Result<Option<Envelope>, TransportError>;

    /// Confirm that the message last returned by `recv` has been fully
    /// handled. Until then a broker-backed transport redelivers it after a
    /// restart.
    async fn ack(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_attempt_keeps_payload() {
        let envelope = Envelope::new(b"{\"user_id\":\"1\"}".to_vec());
        let retry = envelope.next_attempt();

        assert_eq!(retry.payload, envelope.payload);
        assert_eq!(retry.attempt, 1);
        assert_eq!(retry.next_attempt().attempt, 2);
    }

    #[test]
    fn attempt_saturates() {
        let envelope = Envelope {
            payload: vec![],
            attempt: u32::MAX,
        };
        assert_eq!(envelope.next_attempt().attempt, u32::MAX);
    }
}
