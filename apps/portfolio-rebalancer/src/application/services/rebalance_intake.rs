//! Rebalance Intake Service
//!
//! Single entry point for rebalance events. HTTP submissions are stamped
//! and published; queue messages are decoded, restamped and handed to the
//! orchestrator. This is the only place that decides between re-queue,
//! dead-letter and drop.

use std::sync::Arc;
use std::time::Instant;

use crate::application::ports::{
    AllocationStorePort, Envelope, MessageOutcome, NoOpMetrics, QueuePublisherPort,
    RebalanceMetricsPort, TransactionStorePort, TransportError,
};
use crate::application::use_cases::{RebalanceError, RebalancePortfolioUseCase};
use crate::domain::portfolio::Allocation;
use crate::domain::rebalance::RebalanceRequest;
use crate::domain::shared::{Timestamp, UserId};

/// Synchronous submission failure.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    /// The request could not be serialized.
    #[error("failed to encode rebalance request: {0}")]
    Encode(#[from] serde_json::Error),

    /// The queue refused the message.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Why a message was dropped without retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The user has no registered portfolio.
    UserNotFound,
    /// The payload is not a valid rebalance message.
    Malformed,
}

/// What happened to one queue message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// Rebalance completed.
    Processed {
        /// Transactions written (zero when nothing changed).
        transactions: usize,
    },
    /// Re-published for another attempt.
    Requeued {
        /// Attempt number carried by the re-published message.
        attempt: u32,
    },
    /// Attempt limit reached; published to the dead-letter queue.
    DeadLettered {
        /// Failed attempts so far.
        attempts: u32,
    },
    /// Dropped, terminal.
    Dropped(DropReason),
    /// A retryable failure whose re-publish also failed.
    RequeueFailed,
}

impl IntakeOutcome {
    const fn metric(self) -> MessageOutcome {
        match self {
            Self::Processed { .. } => MessageOutcome::Processed,
            Self::Requeued { .. } => MessageOutcome::Requeued,
            Self::DeadLettered { .. } => MessageOutcome::DeadLettered,
            Self::Dropped(DropReason::UserNotFound) => MessageOutcome::DroppedNotFound,
            Self::Dropped(DropReason::Malformed) => MessageOutcome::DroppedDecode,
            Self::RequeueFailed => MessageOutcome::RequeueFailed,
        }
    }
}

/// Rebalance event intake.
///
/// `max_attempts == 0` re-queues forever; otherwise a message that failed
/// `max_attempts` times goes to `dead_letter`.
pub struct RebalanceIntake<A, T, P>
where
    A: AllocationStorePort,
    T: TransactionStorePort,
    P: QueuePublisherPort,
{
    orchestrator: RebalancePortfolioUseCase<A, T>,
    publisher: Arc<P>,
    dead_letter: Arc<dyn QueuePublisherPort>,
    max_attempts: u32,
    metrics: Arc<dyn RebalanceMetricsPort>,
}

impl<A, T, P> RebalanceIntake<A, T, P>
where
    A: AllocationStorePort,
    T: TransactionStorePort,
    P: QueuePublisherPort,
{
    /// Create a new intake that records no metrics.
    pub fn new(
        orchestrator: RebalancePortfolioUseCase<A, T>,
        publisher: Arc<P>,
        dead_letter: Arc<dyn QueuePublisherPort>,
        max_attempts: u32,
    ) -> Self {
        Self {
            orchestrator,
            publisher,
            dead_letter,
            max_attempts,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Report outcomes to `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn RebalanceMetricsPort>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Accept a rebalance submission: stamp it, publish it, return.
    ///
    /// Never processes inline.
    #[tracing::instrument(skip(self, new_allocation), fields(user_id = %user_id))]
    pub async fn submit(
        &self,
        user_id: UserId,
        new_allocation: Allocation,
    ) -> Result<RebalanceRequest, IntakeError> {
        let request = RebalanceRequest::new(user_id, new_allocation, Timestamp::now());

        let result = async {
            let payload = request.encode()?;
            self.publisher.publish(Envelope::new(payload)).await?;
            Ok::<_, IntakeError>(())
        }
        .await;

        self.metrics.record_submission(result.is_ok());
        match result {
            Ok(()) => {
                tracing::info!("Rebalance request queued");
                Ok(request)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to queue rebalance request");
                Err(e)
            }
        }
    }

    /// Handle one queue message.
    #[tracing::instrument(skip(self, envelope), fields(attempt = envelope.attempt))]
    pub async fn handle_message(&self, envelope: Envelope) -> IntakeOutcome {
        let started = Instant::now();
        let outcome = self.process(envelope).await;

        self.metrics.record_message(outcome.metric());
        self.metrics.record_processing_duration(started.elapsed());
        outcome
    }

    async fn process(&self, envelope: Envelope) -> IntakeOutcome {
        let request = match RebalanceRequest::decode(&envelope.payload, Timestamp::now()) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable rebalance message");
                return IntakeOutcome::Dropped(DropReason::Malformed);
            }
        };

        match self.orchestrator.execute(&request).await {
            Ok(stored) => {
                self.metrics.record_transactions_written(stored.len());
                IntakeOutcome::Processed {
                    transactions: stored.len(),
                }
            }
            Err(RebalanceError::UserNotFound { user_id }) => {
                tracing::warn!(user_id = %user_id, "Dropping rebalance for unknown user");
                IntakeOutcome::Dropped(DropReason::UserNotFound)
            }
            Err(RebalanceError::Store(e)) => {
                tracing::warn!(user_id = %request.user_id, error = %e, "Rebalance attempt failed");
                self.retry(&envelope).await
            }
        }
    }

    async fn retry(&self, envelope: &Envelope) -> IntakeOutcome {
        let next = envelope.next_attempt();

        if self.max_attempts == 0 || next.attempt < self.max_attempts {
            let attempt = next.attempt;
            return match self.publisher.publish(next).await {
                Ok(()) => {
                    tracing::info!(attempt, "Rebalance message re-queued");
                    IntakeOutcome::Requeued { attempt }
                }
                Err(e) => {
                    tracing::error!(attempt, error = %e, "Failed to re-queue rebalance message");
                    IntakeOutcome::RequeueFailed
                }
            };
        }

        let attempts = next.attempt;
        match self.dead_letter.publish(next).await {
            Ok(()) => {
                tracing::error!(attempts, "Rebalance message dead-lettered");
                IntakeOutcome::DeadLettered { attempts }
            }
            Err(e) => {
                tracing::error!(attempts, error = %e, "Failed to dead-letter rebalance message");
                IntakeOutcome::RequeueFailed
            }
        }
    }
}
