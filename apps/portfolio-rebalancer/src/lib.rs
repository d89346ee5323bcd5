// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Portfolio Rebalancer - Service Library
//!
//! Accepts rebalance requests over HTTP, queues them, and turns each
//! request into BUY/SELL transactions against the user's stored allocation.
//!
//! # Architecture (Hexagonal)
//!
//! - **Domain**: Allocations, rebalance requests and transactions, and the
//!   pure diff calculator
//!   - `portfolio`: The per-user allocation record
//!   - `rebalance`: Requests, transactions, `calculate`
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Store and queue interfaces
//!   - `use_cases`: `RebalancePortfolio`, `RegisterPortfolio`, lookups
//!   - `services`: Event intake with requeue/dead-letter, consumer loop
//!
//! - **Infrastructure**: Adapters
//!   - `persistence`: In-memory and Elasticsearch stores
//!   - `queue`: In-memory and Kafka transports
//!   - `http`: axum REST API
//!
//! # Delivery
//!
//! Every rebalance goes through the queue. A message whose attempt fails on
//! a store error is re-published with its original bytes, so processing is
//! at-least-once and a partially written batch may be written again.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Domain layer - Business types with no I/O.
pub mod domain;

/// Application layer - Use cases, services, and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and service plumbing.
pub mod infrastructure;

// Domain re-exports
pub use domain::portfolio::{Allocation, Portfolio};
pub use domain::rebalance::{RebalanceAction, RebalanceRequest, RebalanceTransaction, calculate};
pub use domain::shared::{Timestamp, TransactionId, UserId};

// Application re-exports
pub use application::ports::{
    AllocationStorePort, Envelope, MessageOutcome, NoOpMetrics, QueueConsumerPort,
    QueuePublisherPort, RebalanceMetricsPort, StoreError, TransactionStorePort, TransportError,
};
pub use application::services::{IntakeOutcome, RebalanceConsumer, RebalanceIntake};
pub use application::use_cases::{
    GetPortfolioUseCase, ListTransactionsUseCase, RebalancePortfolioUseCase,
    RegisterPortfolioUseCase,
};

// Infrastructure re-exports
pub use infrastructure::config::ServiceConfig;
pub use infrastructure::http::{AppState, create_router};
pub use infrastructure::metrics::{PrometheusMetrics, init_metrics};
pub use infrastructure::persistence::{InMemoryAllocationStore, InMemoryTransactionStore};
pub use infrastructure::queue::{InMemoryQueue, LoggingDeadLetter};
