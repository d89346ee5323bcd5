//! Service Configuration Settings
//!
//! Configuration types for the rebalancer, loaded from environment variables.

use std::time::Duration;

use crate::infrastructure::persistence::elasticsearch::ElasticsearchConfig;

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// HTTP API port.
    pub http_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { http_port: 8080 }
    }
}

/// Elasticsearch connection settings.
#[derive(Debug, Clone)]
pub struct ElasticsearchSettings {
    /// Store client configuration.
    pub client: ElasticsearchConfig,
    /// Readiness checks at startup before giving up.
    pub connect_attempts: u32,
    /// Pause between readiness checks.
    pub connect_delay: Duration,
}

/// Which allocation/transaction store backs the service.
#[derive(Debug, Clone)]
pub enum StoreSettings {
    /// Process-local maps; lost on restart.
    Memory,
    /// Elasticsearch indices.
    Elasticsearch(ElasticsearchSettings),
}

impl StoreSettings {
    /// Backend name for logging.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Elasticsearch(_) => "elasticsearch",
        }
    }
}

/// Kafka connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaSettings {
    /// Bootstrap servers.
    pub broker: String,
    /// Rebalance request topic.
    pub topic: String,
    /// Consumer group id.
    pub group_id: String,
    /// Topic receiving messages that exhausted their attempts.
    pub dead_letter_topic: String,
}

/// Which queue transport carries rebalance requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueSettings {
    /// In-process channel.
    Memory,
    /// Kafka topic.
    Kafka(KafkaSettings),
}

impl QueueSettings {
    /// Backend name for logging.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Kafka(_) => "kafka",
        }
    }
}

/// Rebalance pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalanceSettings {
    /// Failed attempts before dead-lettering (0 = re-queue forever).
    pub max_attempts: u32,
    /// Pause after a failed queue read.
    pub consumer_error_backoff: Duration,
}

impl Default for RebalanceSettings {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            consumer_error_backoff: Duration::from_millis(1000),
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Server port settings.
    pub server: ServerSettings,
    /// Store backend.
    pub store: StoreSettings,
    /// Queue backend.
    pub queue: QueueSettings,
    /// Retry and consumer settings.
    pub rebalance: RebalanceSettings,
    /// Install the Prometheus recorder.
    pub metrics_enabled: bool,
}

impl ServiceConfig {
    /// Default Kafka consumer group.
    pub const DEFAULT_GROUP_ID: &'static str = "portfolio-rebalancer-group";

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a selected backend is missing required variables
    /// or a backend name is unknown.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let server = ServerSettings {
            http_port: env.parse_or("HTTP_PORT", ServerSettings::default().http_port),
        };

        let store = match env.choice("STORE_BACKEND", "memory").as_str() {
            "memory" => StoreSettings::Memory,
            "elasticsearch" => StoreSettings::Elasticsearch(elasticsearch_settings(&env)?),
            other => return Err(ConfigError::invalid("STORE_BACKEND", other)),
        };

        let queue = match env.choice("QUEUE_BACKEND", "memory").as_str() {
            "memory" => QueueSettings::Memory,
            "kafka" => QueueSettings::Kafka(kafka_settings(&env)?),
            other => return Err(ConfigError::invalid("QUEUE_BACKEND", other)),
        };

        let defaults = RebalanceSettings::default();
        let rebalance = RebalanceSettings {
            max_attempts: env.parse_or("REBALANCE_MAX_ATTEMPTS", defaults.max_attempts),
            consumer_error_backoff: env.millis_or(
                "CONSUMER_ERROR_BACKOFF_MS",
                defaults.consumer_error_backoff,
            ),
        };

        let metrics_enabled = env
            .get("METRICS_ENABLED")
            .is_none_or(|v| v.to_lowercase() != "false");

        Ok(Self {
            server,
            store,
            queue,
            rebalance,
            metrics_enabled,
        })
    }
}

fn elasticsearch_settings<F>(env: &Env<F>) -> Result<ElasticsearchSettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = ElasticsearchConfig::new(env.required("ELASTICSEARCH_URL")?);
    let portfolio_index = env
        .get("ELASTICSEARCH_PORTFOLIO_INDEX")
        .unwrap_or_else(|| defaults.portfolio_index.clone());
    let transaction_index = env
        .get("ELASTICSEARCH_TRANSACTION_INDEX")
        .unwrap_or_else(|| defaults.transaction_index.clone());
    let timeout = env.secs_or("ELASTICSEARCH_TIMEOUT_SECS", defaults.timeout);
    let max_results = env.parse_or("ELASTICSEARCH_MAX_RESULTS", defaults.max_results);

    let client = defaults
        .with_indices(portfolio_index, transaction_index)
        .with_timeout(timeout)
        .with_max_results(max_results);

    Ok(ElasticsearchSettings {
        client,
        connect_attempts: env.parse_or("ELASTICSEARCH_CONNECT_ATTEMPTS", 5),
        connect_delay: env.secs_or("ELASTICSEARCH_CONNECT_DELAY_SECS", Duration::from_secs(5)),
    })
}

fn kafka_settings<F>(env: &Env<F>) -> Result<KafkaSettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let broker = env.required("KAFKA_BROKER")?;
    let topic = env.required("KAFKA_TOPIC")?;
    let group_id = env
        .get("KAFKA_GROUP_ID")
        .unwrap_or_else(|| ServiceConfig::DEFAULT_GROUP_ID.to_string());
    let dead_letter_topic = env
        .get("KAFKA_DEAD_LETTER_TOPIC")
        .unwrap_or_else(|| format!("{topic}.dlq"));

    Ok(KafkaSettings {
        broker,
        topic,
        group_id,
        dead_letter_topic,
    })
}

/// Configuration error.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable has a value outside its allowed set.
    #[error("environment variable {key} has invalid value {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, value: &str) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// Variable source with the parsing helpers.
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        let value = self
            .get(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
        if value.trim().is_empty() {
            return Err(ConfigError::EmptyValue(key.to_string()));
        }
        Ok(value)
    }

    /// Lower-cased value, or `default` when unset or blank.
    fn choice(&self, key: &str, default: &str) -> String {
        self.get(key)
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn secs_or(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(default, Duration::from_secs)
    }

    fn millis_or(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(default, Duration::from_millis)
    }
}
