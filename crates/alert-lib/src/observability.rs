//! Observability infrastructure for the alerter
//!
//! Provides:
//! - Prometheus metrics (run latency, run and failure counts, alerts sent)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

use crate::anomaly::AlertDecision;

/// Histogram buckets for pipeline run latency (in seconds)
const RUN_LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AlerterMetricsInner> = OnceLock::new();

struct AlerterMetricsInner {
    run_latency_seconds: Histogram,
    runs_total: IntCounter,
    run_failures_total: IntCounter,
    alerts_total: IntCounter,
    metrics_evaluated: IntGauge,
    last_run_points: IntGauge,
    last_success_timestamp: IntGauge,
}

impl AlerterMetricsInner {
    fn new() -> Self {
        Self {
            run_latency_seconds: register_histogram!(
                "metric_alerter_run_latency_seconds",
                "Wall time of one pipeline run",
                RUN_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register run_latency_seconds"),

            runs_total: register_int_counter!(
                "metric_alerter_runs_total",
                "Pipeline runs attempted"
            )
            .expect("Failed to register runs_total"),

            run_failures_total: register_int_counter!(
                "metric_alerter_run_failures_total",
                "Pipeline runs that ended in an error"
            )
            .expect("Failed to register run_failures_total"),

            alerts_total: register_int_counter!(
                "metric_alerter_alerts_total",
                "Notifications delivered for anomalous metrics"
            )
            .expect("Failed to register alerts_total"),

            metrics_evaluated: register_int_gauge!(
                "metric_alerter_metrics_evaluated",
                "Metrics evaluated in the last run"
            )
            .expect("Failed to register metrics_evaluated"),

            last_run_points: register_int_gauge!(
                "metric_alerter_last_run_points",
                "Buckets in the unified table of the last run"
            )
            .expect("Failed to register last_run_points"),

            last_success_timestamp: register_int_gauge!(
                "metric_alerter_last_success_timestamp_seconds",
                "Unix time of the last successful run"
            )
            .expect("Failed to register last_success_timestamp"),
        }
    }
}

/// Alerter metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct AlerterMetrics {
    _private: (),
}

impl Default for AlerterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AlerterMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AlerterMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AlerterMetricsInner {
        GLOBAL_METRICS.get_or_init(AlerterMetricsInner::new)
    }

    pub fn observe_run_latency(&self, duration_secs: f64) {
        self.inner().run_latency_seconds.observe(duration_secs);
    }

    pub fn inc_runs(&self) {
        self.inner().runs_total.inc();
    }

    pub fn inc_run_failures(&self) {
        self.inner().run_failures_total.inc();
    }

    pub fn inc_alerts(&self) {
        self.inner().alerts_total.inc();
    }

    /// Record the shape of a completed run
    pub fn set_last_run(&self, metrics_evaluated: usize, points: usize, finished_at: i64) {
        self.inner().metrics_evaluated.set(metrics_evaluated as i64);
        self.inner().last_run_points.set(points as i64);
        self.inner().last_success_timestamp.set(finished_at);
    }
}

/// Structured logger for alerter events
///
/// Keeps the field names of run-level events consistent across the
/// pipeline, the scheduler and the notifiers.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn log_startup(&self, version: &str, metrics: &[String]) {
        info!(
            event = "alerter_started",
            instance = %self.instance,
            version = %version,
            metrics = %metrics.join(","),
            "Metric alerter started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "alerter_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Metric alerter shutting down"
        );
    }

    pub fn log_run_started(&self, window_start: &str, window_end: &str) {
        info!(
            event = "run_started",
            instance = %self.instance,
            window_start = %window_start,
            window_end = %window_end,
            "Pipeline run started"
        );
    }

    pub fn log_run_completed(&self, points: usize, metrics: usize, alerts: usize, elapsed_ms: u64) {
        info!(
            event = "run_completed",
            instance = %self.instance,
            points = points,
            metrics = metrics,
            alerts = alerts,
            elapsed_ms = elapsed_ms,
            "Pipeline run completed"
        );
    }

    pub fn log_run_failed(&self, attempt: u32, max_attempts: u32, error: &str) {
        error!(
            event = "run_failed",
            instance = %self.instance,
            attempt = attempt,
            max_attempts = max_attempts,
            error = %error,
            "Pipeline run failed"
        );
    }

    pub fn log_retry_scheduled(&self, attempt: u32, delay_secs: u64) {
        warn!(
            event = "run_retry_scheduled",
            instance = %self.instance,
            next_attempt = attempt,
            delay_secs = delay_secs,
            "Retrying pipeline run"
        );
    }

    /// Log a metric that crossed its bound
    pub fn log_anomaly(&self, decision: &AlertDecision) {
        warn!(
            event = "anomaly_detected",
            instance = %self.instance,
            metric = %decision.metric_name,
            bucket = %decision.timestamp,
            current_value = decision.current_value,
            previous_value = ?decision.previous_value,
            upper = ?decision.upper_bound(),
            lower = ?decision.lower_bound(),
            breach = %decision.breach,
            relative_change = %decision.relative_change,
            "Metric outside IQR bounds"
        );
    }

    /// Log a notification payload in place of delivering it
    pub fn log_notification(&self, metric: &str, text: &str, chart_points: usize) {
        warn!(
            event = "metric_anomaly",
            instance = %self.instance,
            metric = %metric,
            text = %text,
            chart_points = chart_points,
            "Anomaly notification"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alerter_metrics_handles_share_registry() {
        let metrics = AlerterMetrics::new();
        let clone = metrics.clone();

        metrics.observe_run_latency(0.02);
        metrics.inc_runs();
        clone.inc_alerts();
        clone.set_last_run(5, 96, 1_700_000_000);

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "metric_alerter_runs_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("alerter-1");
        assert_eq!(logger.instance(), "alerter-1");
    }
}
