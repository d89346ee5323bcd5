//! Application Services
//!
//! Event intake and the queue consumer loop.

mod rebalance_consumer;
mod rebalance_intake;

pub use rebalance_consumer::RebalanceConsumer;
pub use rebalance_intake::{DropReason, IntakeError, IntakeOutcome, RebalanceIntake};
