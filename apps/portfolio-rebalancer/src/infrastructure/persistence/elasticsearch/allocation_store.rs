//! Allocation store backed by an Elasticsearch index.
//!
//! One document per user, with the user id as document id.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::application::ports::{AllocationStorePort, StoreError};
use crate::domain::portfolio::Portfolio;
use crate::domain::shared::UserId;

use super::client::{Body, ElasticsearchClient};
use super::error::ElasticsearchError;

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(rename = "_source")]
    source: Portfolio,
}

/// Elasticsearch implementation of `AllocationStorePort`.
#[derive(Debug, Clone)]
pub struct ElasticsearchAllocationStore {
    client: ElasticsearchClient,
    index: String,
}

impl ElasticsearchAllocationStore {
    /// Create a store over `index`.
    pub fn new(client: ElasticsearchClient, index: impl Into<String>) -> Self {
        Self {
            client,
            index: index.into(),
        }
    }
}

#[async_trait]
impl AllocationStorePort for ElasticsearchAllocationStore {
    async fn get(&self, user_id: &UserId) -> Result<Option<Portfolio>, StoreError> {
        let response = self
            .client
            .send(
                Method::GET,
                &[self.index.as_str(), "_doc", user_id.as_str()],
                &[],
                Body::Empty,
            )
            .await?;

        if response.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let found: GetResponse = response.into_json()?;
        Ok(Some(found.source))
    }

    async fn put(&self, portfolio: &Portfolio) -> Result<(), StoreError> {
        let document = serde_json::to_value(portfolio)
            .map_err(|e| ElasticsearchError::JsonParse(e.to_string()))?;

        let response = self
            .client
            .send(
                Method::PUT,
                &[self.index.as_str(), "_doc", portfolio.user_id.as_str()],
                &[("refresh", "wait_for")],
                Body::Json(&document),
            )
            .await?;

        let _: Value = response.into_json()?;
        tracing::debug!(user_id = %portfolio.user_id, "Portfolio indexed");
        Ok(())
    }
}
