//! Configuration Module
//!
//! Environment-driven configuration for the rebalancer service.

mod settings;

pub use settings::{
    ConfigError, ElasticsearchSettings, KafkaSettings, QueueSettings, RebalanceSettings,
    ServerSettings, ServiceConfig, StoreSettings,
};
