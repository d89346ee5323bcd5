//! Rebalance Context
//!
//! Requests to move a portfolio to a new allocation, the transactions that
//! result, and the pure calculator between them.

pub mod calculator;
mod request;
mod transaction;

pub use calculator::calculate;
pub use request::{DecodeError, RebalanceRequest};
pub use transaction::{RebalanceAction, RebalanceTransaction};
