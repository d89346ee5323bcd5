//! Dead-letter sink for transports without a dead-letter destination.

use async_trait::async_trait;

use crate::application::ports::{Envelope, QueuePublisherPort, TransportError};

/// Longest payload excerpt written to the log.
const PREVIEW_BYTES: usize = 512;

/// Logs dead-lettered messages and keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDeadLetter;

/// Printable head of a payload.
fn preview(payload: &[u8]) -> String {
    let head = &payload[..payload.len().min(PREVIEW_BYTES)];
    String::from_utf8_lossy(head).into_owned()
}

#[async_trait]
impl QueuePublisherPort for LoggingDeadLetter {
    async fn publish(&self, envelope: Envelope) -> Result<(), TransportError> {
        tracing::error!(
            attempts = envelope.attempt,
            bytes = envelope.payload.len(),
            payload = %preview(&envelope.payload),
            "Rebalance message dead-lettered and discarded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_and_discards() {
        let sink = LoggingDeadLetter;
        let envelope = Envelope::new(br#"{"user_id":"u1"}"#.to_vec()).next_attempt();
        assert!(sink.publish(envelope).await.is_ok());
    }

    #[test]
    fn preview_is_bounded() {
        let payload = vec![b'x'; PREVIEW_BYTES * 4];
        assert_eq!(preview(&payload).len(), PREVIEW_BYTES);
        assert_eq!(preview(b"short"), "short");
    }
}
