//! Get Portfolio Use Case

use std::sync::Arc;

use crate::application::ports::AllocationStorePort;
use crate::domain::portfolio::Portfolio;
use crate::domain::shared::UserId;

use super::PortfolioError;

/// Use case for reading a user's current allocation record.
pub struct GetPortfolioUseCase<A>
where
    A: AllocationStorePort,
{
    allocation_store: Arc<A>,
}

impl<A> GetPortfolioUseCase<A>
where
    A: AllocationStorePort,
{
    /// Create a new GetPortfolioUseCase.
    pub const fn new(allocation_store: Arc<A>) -> Self {
        Self { allocation_store }
    }

    /// Load the record for `user_id`.
    pub async fn execute(&self, user_id: &UserId) -> Result<Portfolio, PortfolioError> {
        self.allocation_store
            .get(user_id)
            .await?
            .ok_or_else(|| PortfolioError::NotFound {
                user_id: user_id.clone(),
            })
    }
}
