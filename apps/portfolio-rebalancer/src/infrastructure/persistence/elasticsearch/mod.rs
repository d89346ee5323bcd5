//! Elasticsearch Persistence Adapters
//!
//! Allocation and transaction stores over the Elasticsearch REST API.

mod allocation_store;
mod client;
mod config;
mod error;
mod transaction_store;

pub use allocation_store::ElasticsearchAllocationStore;
pub use client::ElasticsearchClient;
pub use config::{ElasticsearchConfig, RetryConfig};
pub use error::ElasticsearchError;
pub use transaction_store::ElasticsearchTransactionStore;

use serde_json::{Value, json};

fn portfolio_mappings() -> Value {
    json!({
        "properties": {
            "user_id": { "type": "keyword" },
            "allocation": { "type": "object", "dynamic": true }
        }
    })
}

fn transaction_mappings() -> Value {
    json!({
        "properties": {
            "id": { "type": "keyword" },
            "user_id": { "type": "keyword" },
            "asset": { "type": "keyword" },
            "action": { "type": "keyword" },
            "rebalance_percent": { "type": "double" },
            "created_at": { "type": "date" }
        }
    })
}

/// Create the portfolio and transaction indices if they do not exist.
pub async fn ensure_indices(
    client: &ElasticsearchClient,
    config: &ElasticsearchConfig,
) -> Result<(), ElasticsearchError> {
    client
        .ensure_index(&config.portfolio_index, &portfolio_mappings())
        .await?;
    client
        .ensure_index(&config.transaction_index, &transaction_mappings())
        .await
}

/// Connect to the cluster, create missing indices, and build both stores.
///
/// Waits for readiness up to `connect_attempts` times, `connect_delay`
/// apart.
pub async fn connect(
    config: &ElasticsearchConfig,
    connect_attempts: u32,
    connect_delay: std::time::Duration,
) -> Result<(ElasticsearchAllocationStore, ElasticsearchTransactionStore), ElasticsearchError> {
    let client = ElasticsearchClient::new(config)?;
    client.wait_until_ready(connect_attempts, connect_delay).await?;
    ensure_indices(&client, config).await?;

    Ok((
        ElasticsearchAllocationStore::new(client.clone(), config.portfolio_index.clone()),
        ElasticsearchTransactionStore::new(
            client,
            config.transaction_index.clone(),
            config.max_results,
        ),
    ))
}
