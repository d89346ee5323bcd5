//! Transaction store backed by an Elasticsearch index.
//!
//! Batches go through the `_bulk` API with `refresh=wait_for`, so a search
//! issued after a successful append sees every record of the batch. A batch
//! is all-or-nothing: when some items are refused, the accepted ones are
//! deleted again before the append reports failure.

use std::fmt::Write as _;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::application::ports::{StoreError, TransactionStorePort};
use crate::domain::rebalance::RebalanceTransaction;
use crate::domain::shared::UserId;

use super::client::{Body, ElasticsearchClient};
use super::error::ElasticsearchError;

#[derive(Debug, Deserialize)]
struct BulkResponse {
    errors: bool,
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_source")]
    source: RebalanceTransaction,
    #[serde(default)]
    sort: Vec<Value>,
}

/// Elasticsearch implementation of `TransactionStorePort`.
#[derive(Debug, Clone)]
pub struct ElasticsearchTransactionStore {
    client: ElasticsearchClient,
    index: String,
    page_size: usize,
}

impl ElasticsearchTransactionStore {
    /// Create a store over `index`. Queries fetch `page_size` hits per
    /// search request and page through the rest.
    pub fn new(client: ElasticsearchClient, index: impl Into<String>, page_size: usize) -> Self {
        Self {
            client,
            index: index.into(),
            page_size: page_size.max(1),
        }
    }

    fn bulk_body(&self, transactions: &[RebalanceTransaction]) -> Result<String, ElasticsearchError> {
        let mut body = String::new();
        for tx in transactions {
            let id = tx.id.as_ref().map(|id| id.as_str().to_string());
            let action = json!({ "index": { "_index": self.index, "_id": id } });
            let document =
                serde_json::to_string(tx).map_err(|e| ElasticsearchError::JsonParse(e.to_string()))?;
            // Writing into a String cannot fail.
            let _ = writeln!(body, "{action}");
            let _ = writeln!(body, "{document}");
        }
        Ok(body)
    }

    /// Delete the items of a refused batch that were indexed anyway.
    async fn roll_back(&self, ids: &[String]) -> Result<(), ElasticsearchError> {
        let mut body = String::new();
        for id in ids {
            let action = json!({ "delete": { "_index": self.index, "_id": id } });
            let _ = writeln!(body, "{action}");
        }

        let response = self
            .client
            .send(
                Method::POST,
                &["_bulk"],
                &[("refresh", "wait_for")],
                Body::NdJson(&body),
            )
            .await?;

        let result: BulkResponse = response.into_json()?;
        if result.errors {
            return Err(ElasticsearchError::BulkRejected {
                failed: failed_items(&result.items).max(1),
                total: ids.len(),
            });
        }
        Ok(())
    }

    fn search_body(&self, user_id: &UserId, search_after: Option<&[Value]>) -> Value {
        let mut query = json!({
            "size": self.page_size,
            "query": { "term": { "user_id": user_id.as_str() } },
            "sort": [
                { "created_at": { "order": "asc" } },
                { "asset": { "order": "asc" } },
                { "id": { "order": "asc" } }
            ]
        });
        if let Some(after) = search_after {
            query["search_after"] = Value::Array(after.to_vec());
        }
        query
    }
}

/// The single operation result inside one bulk response item.
fn item_result(item: &Value) -> Option<&Value> {
    item.as_object().and_then(|ops| ops.values().next())
}

/// Items in a bulk response that carry an error.
fn failed_items(items: &[Value]) -> usize {
    items
        .iter()
        .filter(|item| item_result(item).is_some_and(|result| result.get("error").is_some()))
        .count()
}

/// Ids of the batch items the cluster accepted. Items answer in request
/// order, so a missing `_id` falls back to the id that was sent.
fn accepted_ids(items: &[Value], sent: &[RebalanceTransaction]) -> Vec<String> {
    items
        .iter()
        .zip(sent)
        .filter_map(|(item, tx)| {
            let result = item_result(item)?;
            let status = result.get("status").and_then(Value::as_u64)?;
            if result.get("error").is_some() || !(200..300).contains(&status) {
                return None;
            }
            result
                .get("_id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| tx.id.as_ref().map(|id| id.as_str().to_string()))
        })
        .collect()
}

#[async_trait]
impl TransactionStorePort for ElasticsearchTransactionStore {
    async fn bulk_append(
        &self,
        transactions: Vec<RebalanceTransaction>,
    ) -> Result<Vec<RebalanceTransaction>, StoreError> {
        if transactions.is_empty() {
            return Ok(transactions);
        }

        let stored: Vec<RebalanceTransaction> = transactions
            .into_iter()
            .map(RebalanceTransaction::with_assigned_id)
            .collect();
        let body = self.bulk_body(&stored)?;

        let response = self
            .client
            .send(
                Method::POST,
                &["_bulk"],
                &[("refresh", "wait_for")],
                Body::NdJson(&body),
            )
            .await?;

        let result: BulkResponse = response.into_json()?;
        if result.errors {
            let failed = failed_items(&result.items).max(1);
            tracing::error!(failed, total = stored.len(), "Bulk index partially rejected");

            let accepted = accepted_ids(&result.items, &stored);
            if !accepted.is_empty() {
                match self.roll_back(&accepted).await {
                    Ok(()) => {
                        tracing::warn!(removed = accepted.len(), "Rolled back accepted bulk items");
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            ids = ?accepted,
                            "Failed to roll back accepted bulk items"
                        );
                    }
                }
            }

            return Err(ElasticsearchError::BulkRejected {
                failed,
                total: stored.len(),
            }
            .into());
        }

        tracing::debug!(count = stored.len(), "Bulk indexed transactions");
        Ok(stored)
    }

    async fn query_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<RebalanceTransaction>, StoreError> {
        let mut found = Vec::new();
        let mut search_after: Option<Vec<Value>> = None;

        loop {
            let query = self.search_body(user_id, search_after.as_deref());
            let response = self
                .client
                .send(
                    Method::POST,
                    &[self.index.as_str(), "_search"],
                    &[],
                    Body::Json(&query),
                )
                .await?;

            // No index yet means no transactions yet.
            if response.status == StatusCode::NOT_FOUND {
                return Ok(found);
            }

            let result: SearchResponse = response.into_json()?;
            let full_page = result.hits.hits.len() >= self.page_size;
            let last_sort = result.hits.hits.last().map(|hit| hit.sort.clone());
            found.extend(result.hits.hits.into_iter().map(|hit| hit.source));

            match last_sort {
                Some(sort) if full_page && !sort.is_empty() => search_after = Some(sort),
                _ => break,
            }
        }

        tracing::debug!(count = found.len(), "Queried transactions");
        Ok(found)
    }
}
