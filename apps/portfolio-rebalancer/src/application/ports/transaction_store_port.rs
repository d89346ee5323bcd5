//! Transaction Store Port (Driven Port)
//!
//! Append-only log of rebalance transactions, queryable by user.

use async_trait::async_trait;

use crate::domain::rebalance::RebalanceTransaction;
use crate::domain::shared::UserId;

use super::StoreError;

/// Port for the rebalance transaction log.
#[async_trait]
pub trait TransactionStorePort: Send + Sync {
    /// Append a batch in one call.
    ///
    /// Records without an id get one. When this returns `Ok`, a following
    /// [`query_by_user`](Self::query_by_user) observes the whole batch.
    /// Returns the records as stored.
    async fn bulk_append(
        &self,
        transactions: Vec<RebalanceTransaction>,
    ) -> Result<Vec<RebalanceTransaction>, StoreError>;

    /// All transactions of `user_id`, ordered by `created_at` then asset.
    async fn query_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<RebalanceTransaction>, StoreError>;
}
