//! Portfolio Rebalancer Binary
//!
//! Starts the HTTP API and the rebalance queue consumer.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin portfolio-rebalancer
//! cargo run --bin portfolio-rebalancer --features kafka
//! ```
//!
//! # Environment Variables
//!
//! ## Optional
//! - `HTTP_PORT`: HTTP server port (default: 8080)
//! - `STORE_BACKEND`: memory | elasticsearch (default: memory)
//! - `ELASTICSEARCH_URL`: Cluster URL (required for elasticsearch)
//! - `QUEUE_BACKEND`: memory | kafka (default: memory)
//! - `KAFKA_BROKER`, `KAFKA_TOPIC`: Required for kafka
//! - `REBALANCE_MAX_ATTEMPTS`: Attempts before dead-lettering, 0 = unlimited (default: 0)
//! - `METRICS_ENABLED`: Install the Prometheus recorder (default: true)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: false)
//! - `RUST_LOG`: Log level (default: info)

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use portfolio_rebalancer::application::ports::{
    AllocationStorePort, QueueConsumerPort, QueuePublisherPort, TransactionStorePort,
};
use portfolio_rebalancer::application::services::{RebalanceConsumer, RebalanceIntake};
use portfolio_rebalancer::application::use_cases::RebalancePortfolioUseCase;
use portfolio_rebalancer::infrastructure::config::{QueueSettings, ServiceConfig, StoreSettings};
use portfolio_rebalancer::infrastructure::http::{AppState, create_router};
use portfolio_rebalancer::infrastructure::metrics::{PrometheusMetrics, init_metrics};
use portfolio_rebalancer::infrastructure::persistence::elasticsearch;
use portfolio_rebalancer::infrastructure::persistence::{
    InMemoryAllocationStore, InMemoryTransactionStore,
};
use portfolio_rebalancer::infrastructure::queue::{InMemoryQueue, LoggingDeadLetter};
#[cfg(feature = "kafka")]
use portfolio_rebalancer::infrastructure::queue::{KafkaConsumer, KafkaPublisher};
use portfolio_rebalancer::infrastructure::telemetry;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    load_dotenv();

    // Initialize telemetry (tracing + optional OpenTelemetry)
    let _telemetry_guard = telemetry::init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Portfolio Rebalancer"
    );

    let config = ServiceConfig::from_env()?;
    log_config(&config);

    if config.metrics_enabled {
        init_metrics()?;
        tracing::debug!("Prometheus recorder installed");
    }

    let shutdown_token = CancellationToken::new();

    match &config.store {
        StoreSettings::Memory => {
            tracing::warn!("Using in-memory stores, data is lost on restart");
            serve(
                &config,
                Arc::new(InMemoryAllocationStore::new()),
                Arc::new(InMemoryTransactionStore::new()),
                shutdown_token,
            )
            .await?;
        }
        StoreSettings::Elasticsearch(settings) => {
            let (allocations, transactions) = elasticsearch::connect(
                &settings.client,
                settings.connect_attempts,
                settings.connect_delay,
            )
            .await?;
            tracing::info!(url = %settings.client.url, "Connected to Elasticsearch");
            serve(
                &config,
                Arc::new(allocations),
                Arc::new(transactions),
                shutdown_token,
            )
            .await?;
        }
    }

    tracing::info!("Portfolio rebalancer stopped");
    Ok(())
}

/// Pick the queue transport, then run the service on the given stores.
async fn serve<A, T>(
    config: &ServiceConfig,
    allocations: Arc<A>,
    transactions: Arc<T>,
    shutdown_token: CancellationToken,
) -> Result<(), Box<dyn Error>>
where
    A: AllocationStorePort + 'static,
    T: TransactionStorePort + 'static,
{
    match &config.queue {
        QueueSettings::Memory => {
            let queue = Arc::new(InMemoryQueue::new());
            run(
                config,
                allocations,
                transactions,
                (Arc::clone(&queue), Arc::new(LoggingDeadLetter)),
                queue,
                shutdown_token,
            )
            .await
        }
        #[cfg(feature = "kafka")]
        QueueSettings::Kafka(kafka) => {
            let publisher = Arc::new(KafkaPublisher::new(&kafka.broker, kafka.topic.clone())?);
            let dead_letter: Arc<dyn QueuePublisherPort> = Arc::new(KafkaPublisher::new(
                &kafka.broker,
                kafka.dead_letter_topic.clone(),
            )?);
            let consumer = Arc::new(KafkaConsumer::new(
                &kafka.broker,
                &kafka.group_id,
                &kafka.topic,
            )?);
            run(
                config,
                allocations,
                transactions,
                (publisher, dead_letter),
                consumer,
                shutdown_token,
            )
            .await
        }
        #[cfg(not(feature = "kafka"))]
        QueueSettings::Kafka(_) => {
            Err("QUEUE_BACKEND=kafka requires a build with the `kafka` feature".into())
        }
    }
}

/// Wire the pipeline, spawn the consumer and HTTP server, wait for shutdown.
async fn run<A, T, P, C>(
    config: &ServiceConfig,
    allocations: Arc<A>,
    transactions: Arc<T>,
    (publisher, dead_letter): (Arc<P>, Arc<dyn QueuePublisherPort>),
    consumer: Arc<C>,
    shutdown_token: CancellationToken,
) -> Result<(), Box<dyn Error>>
where
    A: AllocationStorePort + 'static,
    T: TransactionStorePort + 'static,
    P: QueuePublisherPort + 'static,
    C: QueueConsumerPort + 'static,
{
    let mut intake = RebalanceIntake::new(
        RebalancePortfolioUseCase::new(Arc::clone(&allocations), Arc::clone(&transactions)),
        publisher,
        dead_letter,
        config.rebalance.max_attempts,
    );
    if config.metrics_enabled {
        intake = intake.with_metrics(Arc::new(PrometheusMetrics));
    }
    let intake = Arc::new(intake);

    // Spawn the queue consumer
    let rebalance_consumer = RebalanceConsumer::new(
        Arc::clone(&intake),
        consumer,
        config.rebalance.consumer_error_backoff,
    );
    let consumer_shutdown = shutdown_token.clone();
    let consumer_handle = tokio::spawn(async move {
        let handled = rebalance_consumer.run(consumer_shutdown).await;
        tracing::info!(handled, "Rebalance consumer stopped");
    });

    // Spawn the HTTP server
    let state = AppState::new(
        &allocations,
        &transactions,
        intake,
        env!("CARGO_PKG_VERSION"),
    );
    let router = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.http_port));
    let listener = TcpListener::bind(addr).await?;
    let server_shutdown = shutdown_token.clone();

    let server_handle = tokio::spawn(async move {
        tracing::info!(addr = %addr, "HTTP server listening");
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
        {
            tracing::error!(error = %e, "HTTP server error");
        }
        tracing::info!("HTTP server stopped");
    });

    tracing::info!("Portfolio rebalancer ready");

    await_shutdown(shutdown_token).await;

    let drained = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        let _ = server_handle.await;
        let _ = consumer_handle.await;
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Graceful shutdown timed out"
        );
    }

    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &ServiceConfig) {
    tracing::info!(
        http_port = config.server.http_port,
        store = config.store.as_str(),
        queue = config.queue.as_str(),
        max_attempts = config.rebalance.max_attempts,
        metrics_enabled = config.metrics_enabled,
        "Configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
