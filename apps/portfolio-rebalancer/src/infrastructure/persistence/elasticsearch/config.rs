//! Elasticsearch adapter configuration.

use std::time::Duration;

/// Connection and index settings for the Elasticsearch stores.
#[derive(Debug, Clone)]
pub struct ElasticsearchConfig {
    /// Cluster base URL, e.g. `http://localhost:9200`.
    pub url: String,
    /// Index holding one allocation document per user.
    pub portfolio_index: String,
    /// Index holding rebalance transactions.
    pub transaction_index: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Page size for transaction searches; larger histories are paged with `search_after`.
    pub max_results: usize,
    /// Retry policy for transient failures within one call.
    pub retry: RetryConfig,
}

impl ElasticsearchConfig {
    /// Default allocation index name.
    pub const DEFAULT_PORTFOLIO_INDEX: &'static str = "portfolios";
    /// Default transaction index name.
    pub const DEFAULT_TRANSACTION_INDEX: &'static str = "rebalance_transactions";
    /// Default search page size.
    pub const DEFAULT_MAX_RESULTS: usize = 10_000;

    /// Create a configuration with default indices, timeout and retry policy.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            portfolio_index: Self::DEFAULT_PORTFOLIO_INDEX.to_string(),
            transaction_index: Self::DEFAULT_TRANSACTION_INDEX.to_string(),
            timeout: Duration::from_secs(30),
            max_results: Self::DEFAULT_MAX_RESULTS,
            retry: RetryConfig::default(),
        }
    }

    /// Set the index names.
    #[must_use]
    pub fn with_indices(
        mut self,
        portfolio_index: impl Into<String>,
        transaction_index: impl Into<String>,
    ) -> Self {
        self.portfolio_index = portfolio_index.into();
        self.transaction_index = transaction_index.into();
        self
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the search page size.
    #[must_use]
    pub const fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Set the retry configuration.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ElasticsearchConfig::new("http://localhost:9200");
        assert_eq!(config.portfolio_index, "portfolios");
        assert_eq!(config.transaction_index, "rebalance_transactions");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_results, 10_000);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn builder_overrides() {
        let config = ElasticsearchConfig::new("http://es:9200")
            .with_indices("p", "t")
            .with_timeout(Duration::from_secs(2))
            .with_max_results(50);
        assert_eq!(config.portfolio_index, "p");
        assert_eq!(config.transaction_index, "t");
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.max_results, 50);
    }
}
