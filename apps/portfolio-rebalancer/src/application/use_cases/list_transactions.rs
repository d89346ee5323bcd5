//! List Transactions Use Case

use std::sync::Arc;

use crate::application::ports::{StoreError, TransactionStorePort};
use crate::domain::rebalance::RebalanceTransaction;
use crate::domain::shared::UserId;

/// Use case for reading a user's rebalance transaction log.
pub struct ListTransactionsUseCase<T>
where
    T: TransactionStorePort,
{
    transaction_store: Arc<T>,
}

impl<T> ListTransactionsUseCase<T>
where
    T: TransactionStorePort,
{
    /// Create a new ListTransactionsUseCase.
    pub const fn new(transaction_store: Arc<T>) -> Self {
        Self { transaction_store }
    }

    /// Transactions of `user_id` ordered by `created_at` then asset. Empty
    /// when the user has none, including unknown users.
    pub async fn execute(&self, user_id: &UserId) -> Result<Vec<RebalanceTransaction>, StoreError> {
        let transactions = self.transaction_store.query_by_user(user_id).await?;
        tracing::debug!(user_id = %user_id, count = transactions.len(), "Listed transactions");
        Ok(transactions)
    }
}
