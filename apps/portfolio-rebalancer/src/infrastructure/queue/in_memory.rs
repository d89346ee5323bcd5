//! In-process queue for development and testing.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::application::ports::{Envelope, QueueConsumerPort, QueuePublisherPort, TransportError};

/// Unbounded in-process queue implementing both queue ports.
///
/// After [`close`](Self::close), publishing fails and the consumer drains
/// what is left, then reports the transport closed.
#[derive(Debug)]
pub struct InMemoryQueue {
    sender: Mutex<Option<UnboundedSender<Envelope>>>,
    receiver: tokio::sync::Mutex<UnboundedReceiver<Envelope>>,
}

impl InMemoryQueue {
    /// Create an open, empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = unbounded_channel();
        Self {
            sender: Mutex::new(Some(sender)),
            receiver: tokio::sync::Mutex::new(receiver),
        }
    }

    /// Stop accepting messages.
    pub fn close(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Take the next message without waiting, if one is ready and no
    /// consumer is currently waiting.
    pub fn try_recv(&self) -> Option<Envelope> {
        self.receiver.try_lock().ok()?.try_recv().ok()
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueuePublisherPort for InMemoryQueue {
    async fn publish(&self, envelope: Envelope) -> Result<(), TransportError> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(TransportError::Closed)?;
        sender.send(envelope).map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl QueueConsumerPort for InMemoryQueue {
    async fn recv(&self) -> Result<Option<Envelope>, TransportError> {
        Ok(self.receiver.lock().await.recv().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_publish_order() {
        let queue = InMemoryQueue::new();
        queue.publish(Envelope::new(b"a".to_vec())).await.unwrap();
        queue.publish(Envelope::new(b"b".to_vec())).await.unwrap();

        assert_eq!(queue.recv().await.unwrap().unwrap().payload, b"a");
        assert_eq!(queue.recv().await.unwrap().unwrap().payload, b"b");
    }

    #[tokio::test]
    async fn keeps_attempt_count() {
        let queue = InMemoryQueue::new();
        let envelope = Envelope::new(b"x".to_vec()).next_attempt();
        queue.publish(envelope.clone()).await.unwrap();

        assert_eq!(queue.try_recv(), Some(envelope));
        assert_eq!(queue.try_recv(), None);
    }

    #[tokio::test]
    async fn close_drains_then_ends() {
        let queue = InMemoryQueue::new();
        queue.publish(Envelope::new(b"last".to_vec())).await.unwrap();
        queue.close();

        assert_eq!(
            queue.publish(Envelope::new(b"late".to_vec())).await,
            Err(TransportError::Closed)
        );
        assert!(queue.recv().await.unwrap().is_some());
        assert!(queue.recv().await.unwrap().is_none());
    }
}
