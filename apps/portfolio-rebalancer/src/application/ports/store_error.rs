//! Store error shared by the persistence ports.

/// Failure talking to a backing store.
///
/// Every variant is transient from the pipeline's point of view: the
/// rebalance event is re-queued rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Store unreachable or request timed out.
    #[error("store connection error: {message}")]
    Connection {
        /// Underlying error description.
        message: String,
    },

    /// Store answered with an error status.
    #[error("store backend error ({status}): {message}")]
    Backend {
        /// HTTP-style status reported by the store.
        status: u16,
        /// Error body or description.
        message: String,
    },

    /// A record could not be encoded or decoded.
    #[error("store serialization error: {message}")]
    Serialization {
        /// Underlying error description.
        message: String,
    },

    /// A bulk write was not accepted in full.
    #[error("bulk write rejected: {failed} of {total} records failed")]
    BulkRejected {
        /// Records the store refused.
        failed: usize,
        /// Records in the batch.
        total: usize,
    },
}

impl StoreError {
    /// Shorthand for a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Shorthand for a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}
