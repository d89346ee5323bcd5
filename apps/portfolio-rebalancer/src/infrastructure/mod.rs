//! Infrastructure Layer
//!
//! Adapters for the application ports plus the ambient service plumbing.
//!
//! - `persistence`: Allocation and transaction stores (in-memory, Elasticsearch)
//! - `queue`: Rebalance queue transports (in-memory, Kafka)
//! - `http`: REST API
//! - `config`: Environment configuration
//! - `telemetry`: Tracing subscriber and OpenTelemetry export
//! - `metrics`: Prometheus recorder and counters

pub mod config;
pub mod http;
pub mod metrics;
pub mod persistence;
pub mod queue;
pub mod telemetry;
