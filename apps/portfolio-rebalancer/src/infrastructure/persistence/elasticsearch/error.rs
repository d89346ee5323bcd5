//! Elasticsearch-specific error types.

use thiserror::Error;

use crate::application::ports::StoreError;

/// Errors from the Elasticsearch adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ElasticsearchError {
    /// Request could not be built or sent.
    #[error("network error: {0}")]
    Network(String),

    /// Cluster answered with a non-retryable error status.
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status.
        status: u16,
        /// Response body.
        message: String,
    },

    /// Response or document could not be (de)serialized.
    #[error("JSON error: {0}")]
    JsonParse(String),

    /// Transient failures persisted past the retry budget.
    #[error("max retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// Some bulk items were refused.
    #[error("bulk request rejected {failed} of {total} items")]
    BulkRejected {
        /// Items with an error.
        failed: usize,
        /// Items in the request.
        total: usize,
    },
}

impl From<ElasticsearchError> for StoreError {
    fn from(err: ElasticsearchError) -> Self {
        match err {
            ElasticsearchError::Network(message) => Self::Connection { message },
            ElasticsearchError::Api { status, message } => Self::Backend { status, message },
            ElasticsearchError::JsonParse(message) => Self::Serialization { message },
            ElasticsearchError::MaxRetriesExceeded { attempts } => Self::Connection {
                message: format!("max retries exceeded after {attempts} attempts"),
            },
            ElasticsearchError::BulkRejected { failed, total } => {
                Self::BulkRejected { failed, total }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_store_error() {
        assert!(matches!(
            StoreError::from(ElasticsearchError::Network("refused".to_string())),
            StoreError::Connection { .. }
        ));
        assert_eq!(
            StoreError::from(ElasticsearchError::Api {
                status: 400,
                message: "bad".to_string()
            }),
            StoreError::Backend {
                status: 400,
                message: "bad".to_string()
            }
        );
        assert!(matches!(
            StoreError::from(ElasticsearchError::MaxRetriesExceeded { attempts: 3 }),
            StoreError::Connection { .. }
        ));
        assert_eq!(
            StoreError::from(ElasticsearchError::BulkRejected { failed: 1, total: 2 }),
            StoreError::BulkRejected { failed: 1, total: 2 }
        );
    }
}
