//! Prometheus Metrics Module
//!
//! Counters and histograms for the rebalance pipeline, rendered at
//! `/metrics` in Prometheus text format.
//!
//! Recording functions are safe to call before (or without) initialization;
//! the `metrics` facade discards samples when no recorder is installed.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::application::ports::{MessageOutcome, RebalanceMetricsPort};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder and describe all metrics.
///
/// Calling this again returns the handle installed by the first call.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "rebalancer_messages_total",
        "Queue messages handled, by outcome"
    );
    describe_counter!(
        "rebalancer_submissions_total",
        "Rebalance submissions received over HTTP, by outcome"
    );
    describe_counter!(
        "rebalancer_transactions_written_total",
        "Rebalance transactions persisted"
    );
    describe_histogram!(
        "rebalancer_processing_seconds",
        "Time to process one queue message"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a handled queue message.
pub fn record_message(outcome: MessageOutcome) {
    counter!("rebalancer_messages_total", "outcome" => outcome.as_str()).increment(1);
}

/// Record an HTTP submission. `accepted` is false when the publish failed.
pub fn record_submission(accepted: bool) {
    let outcome = if accepted { "accepted" } else { "failed" };
    counter!("rebalancer_submissions_total", "outcome" => outcome).increment(1);
}

/// Record persisted transactions.
pub fn record_transactions_written(count: usize) {
    counter!("rebalancer_transactions_written_total").increment(count as u64);
}

/// Record the time spent on one queue message.
pub fn record_processing_duration(duration: Duration) {
    histogram!("rebalancer_processing_seconds").record(duration.as_secs_f64());
}

/// `RebalanceMetricsPort` backed by the global Prometheus recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetrics;

impl RebalanceMetricsPort for PrometheusMetrics {
    fn record_message(&self, outcome: MessageOutcome) {
        record_message(outcome);
    }

    fn record_submission(&self, accepted: bool) {
        record_submission(accepted);
    }

    fn record_transactions_written(&self, count: usize) {
        record_transactions_written(count);
    }

    fn record_processing_duration(&self, duration: Duration) {
        record_processing_duration(duration);
    }
}

// =============================================================================
// Tests
// =============================================================================
