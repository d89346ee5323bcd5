//! Rebalance transaction record.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{Timestamp, TransactionId, UserId};

/// Direction of a rebalance transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RebalanceAction {
    /// Increase exposure to the asset class.
    Buy,
    /// Reduce exposure to the asset class.
    Sell,
}

impl RebalanceAction {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for RebalanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable entry in a user's append-only transaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceTransaction {
    /// Assigned by the transaction store when the batch is persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TransactionId>,
    /// Owner of the rebalanced portfolio.
    pub user_id: UserId,
    /// Asset-class name.
    pub asset: String,
    /// BUY or SELL.
    pub action: RebalanceAction,
    /// Magnitude of the weight change, always positive.
    pub rebalance_percent: Decimal,
    /// Inherited from the triggering request.
    pub created_at: Timestamp,
}

impl RebalanceTransaction {
    /// Return this transaction with an id, generating one if absent.
    #[must_use]
    pub fn with_assigned_id(mut self) -> Self {
        if self.id.is_none() {
            self.id = Some(TransactionId::generate());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> RebalanceTransaction {
        RebalanceTransaction {
            id: None,
            user_id: UserId::new("u1"),
            asset: "stocks".to_string(),
            action: RebalanceAction::Sell,
            rebalance_percent: dec!(10),
            created_at: Timestamp::parse("2026-01-19T12:00:00Z").unwrap(),
        }
    }

    #[test]
    fn action_wire_format() {
        assert_eq!(
            serde_json::to_string(&RebalanceAction::Buy).unwrap(),
            "\"BUY\""
        );
        let parsed: RebalanceAction = serde_json::from_str("\"SELL\"").unwrap();
        assert_eq!(parsed, RebalanceAction::Sell);
        assert_eq!(RebalanceAction::Sell.to_string(), "SELL");
    }

    #[test]
    fn assigns_id_only_when_absent() {
        let assigned = sample().with_assigned_id();
        let id = assigned.id.clone().unwrap();
        assert!(!id.is_blank());

        let kept = assigned.with_assigned_id();
        assert_eq!(kept.id, Some(id));
    }

    #[test]
    fn json_shape() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["user_id"], "u1");
        assert_eq!(value["asset"], "stocks");
        assert_eq!(value["action"], "SELL");
        assert_eq!(value["rebalance_percent"], 10.0);
        assert_eq!(value["created_at"], "2026-01-19T12:00:00Z");
    }
}
