//! Rebalance diff calculator.
//!
//! Pure function from (target, current) allocations to the transactions
//! that move one to the other. The target's asset classes are the universe
//! under consideration: assets present only in `current` are ignored.
//!
//! Sign convention: a target weight above the current weight yields a
//! `SELL`, below yields a `BUY`. Output is ordered by asset-class name.

use std::cmp::Ordering;

use crate::domain::portfolio::Allocation;
use crate::domain::shared::{Timestamp, UserId};

use super::transaction::{RebalanceAction, RebalanceTransaction};

/// Compute the transactions for moving `current` to `target`.
///
/// Missing assets in either map weigh zero. Unchanged weights produce no
/// transaction. Never fails and never mutates its inputs; a difference too
/// large to represent is skipped; see [`Allocation::check_weights`].
#[must_use]
pub fn calculate(
    target: &Allocation,
    current: &Allocation,
    user_id: &UserId,
    created_at: Timestamp,
) -> Vec<RebalanceTransaction> {
    target
        .iter()
        .filter_map(|(asset, target_weight)| {
            let current_weight = current.weight(asset);
            let (action, magnitude) = match target_weight.cmp(&current_weight) {
                Ordering::Greater => (
                    RebalanceAction::Sell,
                    target_weight.checked_sub(current_weight)?,
                ),
                Ordering::Less => (
                    RebalanceAction::Buy,
                    current_weight.checked_sub(target_weight)?,
                ),
                Ordering::Equal => return None,
            };

            Some(RebalanceTransaction {
                id: None,
                user_id: user_id.clone(),
                asset: asset.to_string(),
                action,
                rebalance_percent: magnitude,
                created_at,
            })
        })
        .collect()
}
