//! Application Layer
//!
//! Orchestrates the domain through use cases and services:
//!
//! - **Ports**: Interfaces to the stores and the queue
//! - **Use Cases**: Rebalance, portfolio registration and lookups
//! - **Services**: Event intake and the queue consumer loop

pub mod ports;
pub mod services;
pub mod use_cases;

pub use ports::*;
pub use services::*;
pub use use_cases::*;
