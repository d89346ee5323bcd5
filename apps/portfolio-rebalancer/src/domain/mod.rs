//! Domain Layer
//!
//! Business types and the rebalance calculation, free of I/O.
//!
//! # Bounded Contexts
//!
//! - [`portfolio`]: The per-user current allocation record
//! - [`rebalance`]: Rebalance requests, transactions, and the diff calculator

pub mod portfolio;
pub mod rebalance;
pub mod shared;
