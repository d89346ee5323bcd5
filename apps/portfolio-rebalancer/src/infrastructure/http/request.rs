//! HTTP request DTOs.

use serde::Deserialize;

use crate::domain::portfolio::Allocation;
use crate::domain::shared::UserId;

/// Body of `POST /portfolio`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterPortfolioRequest {
    /// Owner of the portfolio.
    pub user_id: UserId,
    /// Initial allocation in percentage terms.
    #[serde(default)]
    pub allocation: Allocation,
}

/// Body of `POST /rebalance`.
///
/// Any `created_at` the caller sends is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRebalanceRequest {
    /// Owner of the portfolio.
    pub user_id: UserId,
    /// Target allocation in percentage terms.
    #[serde(default)]
    pub new_allocation: Allocation,
}

/// `?userId=` query of the read endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    /// Requested user, if given.
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

impl UserQuery {
    /// The user id when present and not blank.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
            .as_deref()
            .map(UserId::new)
            .filter(|id| !id.is_blank())
    }
}
