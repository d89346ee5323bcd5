//! Shared Value Objects
//!
//! Immutable domain types compared by value.

mod identifiers;
mod timestamp;

pub use identifiers::{TransactionId, UserId};
pub use timestamp::Timestamp;
