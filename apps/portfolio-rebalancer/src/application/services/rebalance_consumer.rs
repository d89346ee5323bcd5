//! Rebalance Consumer
//!
//! Long-running task pulling rebalance messages off the queue and feeding
//! them through the intake one at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    AllocationStorePort, QueueConsumerPort, QueuePublisherPort, TransactionStorePort,
};

use super::RebalanceIntake;

/// Serial queue consumer.
pub struct RebalanceConsumer<A, T, P, C>
where
    A: AllocationStorePort,
    T: TransactionStorePort,
    P: QueuePublisherPort,
    C: QueueConsumerPort,
{
    intake: Arc<RebalanceIntake<A, T, P>>,
    consumer: Arc<C>,
    error_backoff: Duration,
}

impl<A, T, P, C> RebalanceConsumer<A, T, P, C>
where
    A: AllocationStorePort,
    T: TransactionStorePort,
    P: QueuePublisherPort,
    C: QueueConsumerPort,
{
    /// Create a consumer. `error_backoff` is the pause after a failed read.
    pub const fn new(
        intake: Arc<RebalanceIntake<A, T, P>>,
        consumer: Arc<C>,
        error_backoff: Duration,
    ) -> Self {
        Self {
            intake,
            consumer,
            error_backoff,
        }
    }

    /// Run until `shutdown` is cancelled or the transport closes.
    ///
    /// Returns the number of messages handled. Each message is acknowledged
    /// once its outcome is settled. A message in flight when `shutdown`
    /// fires is abandoned unacknowledged: a broker-backed transport
    /// redelivers it after restart, the in-memory queue loses it.
    pub async fn run(&self, shutdown: CancellationToken) -> u64 {
        tracing::info!("Rebalance consumer started");
        let mut handled = 0u64;

        loop {
            let next = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                next = self.consumer.recv() => next,
            };

            match next {
                Ok(Some(envelope)) => {
                    let outcome = tokio::select! {
                        biased;
                        () = shutdown.cancelled() => break,
                        outcome = self.intake.handle_message(envelope) => outcome,
                    };
                    handled += 1;
                    tracing::debug!(?outcome, "Rebalance message handled");
                    if let Err(e) = self.consumer.ack().await {
                        tracing::warn!(error = %e, "Failed to acknowledge rebalance message");
                    }
                }
                Ok(None) => {
                    tracing::info!("Queue closed");
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        backoff_ms = self.error_backoff.as_millis(),
                        "Queue read failed"
                    );
                    tokio::select! {
                        biased;
                        () = shutdown.cancelled() => break,
                        () = tokio::time::sleep(self.error_backoff) => {}
                    }
                }
            }
        }

        tracing::info!(handled, "Rebalance consumer stopped");
        handled
    }
}
