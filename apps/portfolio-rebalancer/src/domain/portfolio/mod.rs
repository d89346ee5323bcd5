//! Portfolio Context
//!
//! A user's current allocation: asset-class name to percentage weight.
//! One record per user, overwritten in place.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::UserId;

/// Largest accepted absolute weight.
pub const MAX_WEIGHT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// An allocation weight outside `[-MAX_WEIGHT, MAX_WEIGHT]`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("weight {weight} for asset {asset} is out of range (max {MAX_WEIGHT})")]
pub struct WeightOutOfRange {
    /// Offending asset class.
    pub asset: String,
    /// Offending weight.
    pub weight: Decimal,
}

/// Mapping from asset-class name to percentage weight.
///
/// Keys iterate in ascending order. Weights are expected to sum to ~100
/// but this is not enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allocation(BTreeMap<String, Decimal>);

impl Allocation {
    /// Create an empty allocation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Weight of `asset`, or zero when the asset is not held.
    #[must_use]
    pub fn weight(&self, asset: &str) -> Decimal {
        self.0.get(asset).copied().unwrap_or(Decimal::ZERO)
    }

    /// Set the weight for an asset class.
    pub fn set(&mut self, asset: impl Into<String>, weight: Decimal) {
        self.0.insert(asset.into(), weight);
    }

    /// Iterate over `(asset, weight)` pairs in asset-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.0.iter().map(|(asset, weight)| (asset.as_str(), *weight))
    }

    /// Number of asset classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no asset classes are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reject weights whose magnitude exceeds [`MAX_WEIGHT`].
    ///
    /// Sums and differences of in-range weights cannot overflow.
    pub fn check_weights(&self) -> Result<(), WeightOutOfRange> {
        match self.iter().find(|(_, weight)| weight.abs() > MAX_WEIGHT) {
            Some((asset, weight)) => Err(WeightOutOfRange {
                asset: asset.to_string(),
                weight,
            }),
            None => Ok(()),
        }
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.0.values().copied().sum()
    }
}

impl<K: Into<String>> FromIterator<(K, Decimal)> for Allocation {
    fn from_iter<I: IntoIterator<Item = (K, Decimal)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// The current allocation record of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Owner of the portfolio.
    pub user_id: UserId,
    /// Current allocation in percentage terms.
    pub allocation: Allocation,
}

impl Portfolio {
    /// Create a new portfolio record.
    #[must_use]
    pub const fn new(user_id: UserId, allocation: Allocation) -> Self {
        Self {
            user_id,
            allocation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn missing_asset_weighs_zero() {
        let allocation: Allocation = [("stocks", dec!(60))].into_iter().collect();
        assert_eq!(allocation.weight("stocks"), dec!(60));
        assert_eq!(allocation.weight("gold"), Decimal::ZERO);
    }

    #[test]
    fn iterates_in_asset_order() {
        let allocation: Allocation = [("stocks", dec!(60)), ("bonds", dec!(30)), ("gold", dec!(10))]
            .into_iter()
            .collect();
        let assets: Vec<&str> = allocation.iter().map(|(a, _)| a).collect();
        assert_eq!(assets, vec!["bonds", "gold", "stocks"]);
        assert_eq!(allocation.total(), dec!(100));
    }

    #[test]
    fn check_weights_bounds_magnitude() {
        let ok: Allocation = [("stocks", MAX_WEIGHT), ("cash", -MAX_WEIGHT)]
            .into_iter()
            .collect();
        assert!(ok.check_weights().is_ok());

        let json = r#"{"stocks":-70000000000000000000000000000}"#;
        let huge: Allocation = serde_json::from_str(json).unwrap();
        let err = huge.check_weights().unwrap_err();
        assert_eq!(err.asset, "stocks");
        assert!(err.weight.is_sign_negative());
    }

    #[test]
    fn deserializes_from_numeric_json() {
        let json = r#"{"user_id":"1","allocation":{"stocks":60,"bonds":30.5,"gold":9.5}}"#;
        let portfolio: Portfolio = serde_json::from_str(json).unwrap();

        assert_eq!(portfolio.user_id, UserId::new("1"));
        assert_eq!(portfolio.allocation.weight("bonds"), dec!(30.5));
        assert_eq!(portfolio.allocation.len(), 3);
    }

    #[test]
    fn serializes_weights_as_numbers() {
        let portfolio = Portfolio::new(
            UserId::new("1"),
            [("stocks", dec!(60))].into_iter().collect(),
        );
        let value = serde_json::to_value(&portfolio).unwrap();
        assert!(value["allocation"]["stocks"].is_number());
    }
}
