//! Persistence Adapters
//!
//! Store implementations of the allocation and transaction ports.

pub mod elasticsearch;
pub mod in_memory;

pub use elasticsearch::{ElasticsearchAllocationStore, ElasticsearchTransactionStore};
pub use in_memory::{InMemoryAllocationStore, InMemoryTransactionStore};
