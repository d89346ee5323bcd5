//! In-memory stores for development and testing.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::application::ports::{AllocationStorePort, StoreError, TransactionStorePort};
use crate::domain::portfolio::Portfolio;
use crate::domain::rebalance::RebalanceTransaction;
use crate::domain::shared::UserId;

/// In-memory implementation of `AllocationStorePort`.
///
/// Suitable for testing and development. Not for production use.
#[derive(Debug, Default)]
pub struct InMemoryAllocationStore {
    portfolios: RwLock<HashMap<UserId, Portfolio>>,
}

impl InMemoryAllocationStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered portfolios.
    #[must_use]
    pub fn len(&self) -> usize {
        self.portfolios
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no portfolio is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AllocationStorePort for InMemoryAllocationStore {
    async fn get(&self, user_id: &UserId) -> Result<Option<Portfolio>, StoreError> {
        let portfolios = self
            .portfolios
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(portfolios.get(user_id).cloned())
    }

    async fn put(&self, portfolio: &Portfolio) -> Result<(), StoreError> {
        let mut portfolios = self
            .portfolios
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        portfolios.insert(portfolio.user_id.clone(), portfolio.clone());
        Ok(())
    }
}

/// In-memory implementation of `TransactionStorePort`.
///
/// A batch is appended under a single write lock, so readers see all of
/// it or none of it.
#[derive(Debug, Default)]
pub struct InMemoryTransactionStore {
    transactions: RwLock<HashMap<UserId, Vec<RebalanceTransaction>>>,
}

impl InMemoryTransactionStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored transactions across all users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transactions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TransactionStorePort for InMemoryTransactionStore {
    async fn bulk_append(
        &self,
        transactions: Vec<RebalanceTransaction>,
    ) -> Result<Vec<RebalanceTransaction>, StoreError> {
        let stored: Vec<RebalanceTransaction> = transactions
            .into_iter()
            .map(RebalanceTransaction::with_assigned_id)
            .collect();

        let mut log = self
            .transactions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for tx in &stored {
            log.entry(tx.user_id.clone()).or_default().push(tx.clone());
        }
        Ok(stored)
    }

    async fn query_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<RebalanceTransaction>, StoreError> {
        let mut found = self
            .transactions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        found.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.asset.cmp(&b.asset))
        });
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rebalance::RebalanceAction;
    use crate::domain::shared::Timestamp;
    use rust_decimal_macros::dec;

    fn tx(asset: &str) -> RebalanceTransaction {
        RebalanceTransaction {
            id: None,
            user_id: UserId::new("u1"),
            asset: asset.to_string(),
            action: RebalanceAction::Sell,
            rebalance_percent: dec!(1),
            created_at: Timestamp::parse("2026-01-19T12:00:00Z").unwrap(),
        }
    }

    #[tokio::test]
    async fn put_overwrites_in_place() {
        let store = InMemoryAllocationStore::new();
        let user = UserId::new("u1");

        store
            .put(&Portfolio::new(user.clone(), [("gold", dec!(100))].into_iter().collect()))
            .await
            .unwrap();
        store
            .put(&Portfolio::new(user.clone(), [("bonds", dec!(100))].into_iter().collect()))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        let found = store.get(&user).await.unwrap().unwrap();
        assert_eq!(found.allocation.weight("bonds"), dec!(100));
        assert!(store.get(&UserId::new("u2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bulk_append_assigns_ids_and_is_visible() {
        let store = InMemoryTransactionStore::new();

        let stored = store
            .bulk_append(vec![tx("stocks"), tx("bonds")])
            .await
            .unwrap();

        assert!(stored.iter().all(|t| t.id.is_some()));
        assert_ne!(stored[0].id, stored[1].id);

        let found = store.query_by_user(&UserId::new("u1")).await.unwrap();
        let assets: Vec<&str> = found.iter().map(|t| t.asset.as_str()).collect();
        assert_eq!(assets, vec!["bonds", "stocks"]);
    }

    #[tokio::test]
    async fn empty_log_for_unknown_user() {
        let store = InMemoryTransactionStore::new();
        assert!(store.is_empty());
        assert!(store.query_by_user(&UserId::new("u9")).await.unwrap().is_empty());
    }
}
