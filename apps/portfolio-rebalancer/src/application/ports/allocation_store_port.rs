//! Allocation Store Port (Driven Port)
//!
//! Current allocation record per user, keyed by `user_id`.

use async_trait::async_trait;

use crate::domain::portfolio::Portfolio;
use crate::domain::shared::UserId;

use super::StoreError;

/// Port for reading and writing the per-user allocation record.
#[async_trait]
pub trait AllocationStorePort: Send + Sync {
    /// Load the record for `user_id`. `Ok(None)` means the user has no
    /// registered portfolio; `Err` means the store itself failed.
    async fn get(&self, user_id: &UserId) -> Result<Option<Portfolio>, StoreError>;

    /// Write the record, replacing any existing one for the same user.
    async fn put(&self, portfolio: &Portfolio) -> Result<(), StoreError>;
}
