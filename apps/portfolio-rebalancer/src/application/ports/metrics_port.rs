//! Metrics Port (Driven Port)
//!
//! Counters the rebalance pipeline reports; the Prometheus adapter lives in
//! `infrastructure::metrics`.

use std::time::Duration;

/// Outcome label for a handled queue message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Rebalance recorded (or nothing to record).
    Processed,
    /// Re-published for another attempt.
    Requeued,
    /// Attempt limit reached, sent to the dead-letter queue.
    DeadLettered,
    /// User has no portfolio.
    DroppedNotFound,
    /// Payload could not be decoded.
    DroppedDecode,
    /// Re-publish or dead-letter publish failed.
    RequeueFailed,
}

impl MessageOutcome {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Requeued => "requeued",
            Self::DeadLettered => "dead_lettered",
            Self::DroppedNotFound => "dropped_not_found",
            Self::DroppedDecode => "dropped_decode",
            Self::RequeueFailed => "requeue_failed",
        }
    }
}

/// Port for recording pipeline metrics.
pub trait RebalanceMetricsPort: Send + Sync {
    /// A queue message was handled.
    fn record_message(&self, outcome: MessageOutcome);

    /// An HTTP submission was published (`accepted`) or refused.
    fn record_submission(&self, accepted: bool);

    /// Transactions were persisted.
    fn record_transactions_written(&self, count: usize);

    /// Time spent on one queue message.
    fn record_processing_duration(&self, duration: Duration);
}

/// No-op metrics for testing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl RebalanceMetricsPort for NoOpMetrics {
    fn record_message(&self, _outcome: MessageOutcome) {}

    fn record_submission(&self, _accepted: bool) {}

    fn record_transactions_written(&self, _count: usize) {}

    fn record_processing_duration(&self, _duration: Duration) {}
}
