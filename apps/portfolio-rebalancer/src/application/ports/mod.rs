//! Application Ports (Driven)
//!
//! Interfaces the rebalance pipeline consumes: stores, queue, metrics. Adapters live in
//! `infrastructure`.

mod allocation_store_port;
mod metrics_port;
mod queue_port;
mod store_error;
mod transaction_store_port;

pub use allocation_store_port::AllocationStorePort;
pub use metrics_port::{MessageOutcome, NoOpMetrics, RebalanceMetricsPort};
pub use queue_port::{Envelope, QueueConsumerPort, QueuePublisherPort, TransportError};
pub use store_error::StoreError;
pub use transaction_store_port::TransactionStorePort;
