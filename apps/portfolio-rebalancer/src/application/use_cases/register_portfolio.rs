//! Register Portfolio Use Case
//!
//! Creates the allocation record for a user that has none yet.

use std::sync::Arc;

use crate::application::ports::{AllocationStorePort, StoreError};
use crate::domain::portfolio::{Allocation, Portfolio};
use crate::domain::shared::UserId;

/// Errors from portfolio registration and lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortfolioError {
    /// A record already exists for this user.
    #[error("portfolio already registered for user {user_id}")]
    AlreadyRegistered {
        /// The user.
        user_id: UserId,
    },

    /// No record exists for this user.
    #[error("portfolio not found for user {user_id}")]
    NotFound {
        /// The user.
        user_id: UserId,
    },

    /// The request was rejected before touching the store.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// What was wrong.
        message: String,
    },

    /// The allocation store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Use case for registering a user's initial allocation.
pub struct RegisterPortfolioUseCase<A>
where
    A: AllocationStorePort,
{
    allocation_store: Arc<A>,
}

impl<A> RegisterPortfolioUseCase<A>
where
    A: AllocationStorePort,
{
    /// Create a new RegisterPortfolioUseCase.
    pub const fn new(allocation_store: Arc<A>) -> Self {
        Self { allocation_store }
    }

    /// Register `allocation` for `user_id`.
    ///
    /// The existence check and the write are two store calls, so two
    /// concurrent registrations for one user may both succeed.
    #[tracing::instrument(skip(self, allocation), fields(user_id = %user_id))]
    pub async fn execute(
        &self,
        user_id: UserId,
        allocation: Allocation,
    ) -> Result<Portfolio, PortfolioError> {
        if user_id.is_blank() {
            return Err(PortfolioError::InvalidRequest {
                message: "user_id is required".to_string(),
            });
        }

        allocation
            .check_weights()
            .map_err(|e| PortfolioError::InvalidRequest {
                message: e.to_string(),
            })?;

        if self.allocation_store.get(&user_id).await?.is_some() {
            tracing::warn!("Portfolio already registered");
            return Err(PortfolioError::AlreadyRegistered { user_id });
        }

        let portfolio = Portfolio::new(user_id, allocation);
        self.allocation_store.put(&portfolio).await?;

        tracing::info!(assets = portfolio.allocation.len(), "Portfolio registered");
        Ok(portfolio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::InMemoryAllocationStore;
    use rust_decimal_macros::dec;

    fn allocation() -> Allocation {
        [("stocks", dec!(60)), ("bonds", dec!(40))]
            .into_iter()
            .collect()
    }

    #[tokio::test]
    async fn registers_new_user() {
        let store = Arc::new(InMemoryAllocationStore::new());
        let use_case = RegisterPortfolioUseCase::new(Arc::clone(&store));

        let portfolio = use_case
            .execute(UserId::new("u1"), allocation())
            .await
            .unwrap();

        assert_eq!(portfolio.allocation, allocation());
        let stored = store.get(&UserId::new("u1")).await.unwrap();
        assert_eq!(stored, Some(portfolio));
    }

    #[tokio::test]
    async fn rejects_duplicate_user() {
        let store = Arc::new(InMemoryAllocationStore::new());
        let use_case = RegisterPortfolioUseCase::new(Arc::clone(&store));
        use_case
            .execute(UserId::new("u1"), allocation())
            .await
            .unwrap();

        let other: Allocation = [("gold", dec!(100))].into_iter().collect();
        let err = use_case
            .execute(UserId::new("u1"), other)
            .await
            .unwrap_err();

        assert!(matches!(err, PortfolioError::AlreadyRegistered { .. }));
        let stored = store.get(&UserId::new("u1")).await.unwrap().unwrap();
        assert_eq!(stored.allocation, allocation());
    }

    #[tokio::test]
    async fn rejects_blank_user() {
        let use_case = RegisterPortfolioUseCase::new(Arc::new(InMemoryAllocationStore::new()));

        let err = use_case
            .execute(UserId::new("  "), allocation())
            .await
            .unwrap_err();

        assert!(matches!(err, PortfolioError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn rejects_out_of_range_weight_without_writing() {
        let store = Arc::new(InMemoryAllocationStore::new());
        let use_case = RegisterPortfolioUseCase::new(Arc::clone(&store));
        let extreme: Allocation =
            serde_json::from_str(r#"{"stocks":-70000000000000000000000000000}"#).unwrap();

        let err = use_case
            .execute(UserId::new("u1"), extreme)
            .await
            .unwrap_err();

        assert!(matches!(err, PortfolioError::InvalidRequest { .. }));
        assert!(store.is_empty());
    }
}
