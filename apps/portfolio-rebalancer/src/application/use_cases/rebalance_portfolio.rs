//! Rebalance Portfolio Use Case
//!
//! One read-compute-write attempt: load the user's current allocation,
//! diff it against the requested one, append the resulting transactions.

use std::sync::Arc;

use crate::application::ports::{AllocationStorePort, StoreError, TransactionStorePort};
use crate::domain::rebalance::{RebalanceRequest, RebalanceTransaction, calculate};
use crate::domain::shared::UserId;

/// Outcome of a failed rebalance attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RebalanceError {
    /// The user has no registered portfolio. Terminal.
    #[error("user not found: {user_id}")]
    UserNotFound {
        /// The requested user.
        user_id: UserId,
    },

    /// A store call failed. Retryable.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RebalanceError {
    /// Whether re-running the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

/// Use case driving a single rebalance attempt.
///
/// Performs at most one allocation read and one bulk transaction write.
/// The allocation record itself is left untouched.
pub struct RebalancePortfolioUseCase<A, T>
where
    A: AllocationStorePort,
    T: TransactionStorePort,
{
    allocation_store: Arc<A>,
    transaction_store: Arc<T>,
}

impl<A, T> RebalancePortfolioUseCase<A, T>
where
    A: AllocationStorePort,
    T: TransactionStorePort,
{
    /// Create a new RebalancePortfolioUseCase.
    pub const fn new(allocation_store: Arc<A>, transaction_store: Arc<T>) -> Self {
        Self {
            allocation_store,
            transaction_store,
        }
    }

    /// Execute one attempt. Returns the stored transactions, which is empty
    /// when the requested allocation matches the current one.
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn execute(
        &self,
        request: &RebalanceRequest,
    ) -> Result<Vec<RebalanceTransaction>, RebalanceError> {
        let portfolio = self
            .allocation_store
            .get(&request.user_id)
            .await?
            .ok_or_else(|| RebalanceError::UserNotFound {
                user_id: request.user_id.clone(),
            })?;

        let transactions = calculate(
            &request.new_allocation,
            &portfolio.allocation,
            &portfolio.user_id,
            request.created_at,
        );

        if transactions.is_empty() {
            tracing::info!("Allocation unchanged, no transactions to record");
            return Ok(Vec::new());
        }

        let stored = self.transaction_store.bulk_append(transactions).await?;

        tracing::info!(transactions = stored.len(), "Rebalance transactions recorded");
        Ok(stored)
    }
}
