//! One alerting run, composed explicitly
//!
//! ```text
//! sources --fetch--> extracts --merge--> unified table --evaluate--> decisions
//!     --build--> payloads --notify--> notifier
//! ```
//!
//! Any hard error aborts the run; retrying is left to the caller.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::anomaly::{
    AlertEvaluator, AnomalyDetector, NotificationPayloadBuilder, DEFAULT_IQR_MULTIPLIER,
    DEFAULT_WINDOW_SIZE,
};
use crate::error::{AlertError, Result};
use crate::health::{components, HealthRegistry};
use crate::models::DEFAULT_BUCKET_WIDTH_SECS;
use crate::notify::Notifier;
use crate::observability::{AlerterMetrics, StructuredLogger};
use crate::source::ExtractSource;
use crate::timeseries::{LookbackWindow, TimeSeriesBuilder, DEFAULT_LOOKBACK_SECS};

/// Metrics evaluated when none are configured
pub const DEFAULT_METRICS: &[&str] = &["users_feed", "views", "likes", "users_message", "messages"];

/// Detection and windowing settings for a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Metrics to evaluate, in notification order
    pub metrics: Vec<String>,
    pub bucket_width_secs: i64,
    pub lookback_secs: i64,
    /// IQR multiplier `a`
    pub iqr_multiplier: f64,
    /// Rolling window size `n`
    pub window_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            metrics: DEFAULT_METRICS.iter().map(|m| m.to_string()).collect(),
            bucket_width_secs: DEFAULT_BUCKET_WIDTH_SECS,
            lookback_secs: DEFAULT_LOOKBACK_SECS,
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.metrics.is_empty() {
            return Err(AlertError::config("at least one metric must be configured"));
        }
        if let Some((i, dup)) = self
            .metrics
            .iter()
            .enumerate()
            .find(|(i, m)| self.metrics[..*i].contains(*m))
        {
            return Err(AlertError::config(format!(
                "metric '{}' is listed twice (position {})",
                dup, i
            )));
        }
        if self.bucket_width_secs <= 0 {
            return Err(AlertError::config("bucket width must be positive"));
        }
        if self.lookback_secs < self.bucket_width_secs {
            return Err(AlertError::config(format!(
                "lookback ({}s) is shorter than one bucket ({}s)",
                self.lookback_secs, self.bucket_width_secs
            )));
        }
        self.detector().map(|_| ())
    }

    pub fn detector(&self) -> Result<AnomalyDetector> {
        AnomalyDetector::new(self.iqr_multiplier, self.window_size)
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub window: LookbackWindow,
    /// Buckets in the unified table
    pub points: usize,
    pub metrics_evaluated: usize,
    /// Metrics notified, in order
    pub alerts: Vec<String>,
}

/// Explicit source → merge → evaluate → notify composition
pub struct Pipeline {
    config: PipelineConfig,
    sources: Vec<Arc<dyn ExtractSource>>,
    evaluator: AlertEvaluator,
    payloads: NotificationPayloadBuilder,
    notifier: Arc<dyn Notifier>,
    metrics: AlerterMetrics,
    logger: StructuredLogger,
    health: Option<HealthRegistry>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        sources: Vec<Arc<dyn ExtractSource>>,
        notifier: Arc<dyn Notifier>,
        logger: StructuredLogger,
    ) -> Result<Self> {
        config.validate()?;
        if sources.is_empty() {
            return Err(AlertError::config("at least one extract source is required"));
        }

        Ok(Self {
            evaluator: AlertEvaluator::new(config.detector()?),
            config,
            sources,
            payloads: NotificationPayloadBuilder::new(),
            notifier,
            metrics: AlerterMetrics::new(),
            logger,
            health: None,
        })
    }

    /// Report component health into `registry` after each run
    pub fn with_health(mut self, registry: HealthRegistry) -> Self {
        self.health = Some(registry);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the whole pipeline once for the window ending at `now`
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RunReport> {
        self.metrics.inc_runs();
        let start = Instant::now();

        let result = self.execute(now).await;
        let elapsed = start.elapsed();
        self.metrics.observe_run_latency(elapsed.as_secs_f64());

        match &result {
            Ok(report) => {
                let finished_at = Utc::now().timestamp();
                self.metrics
                    .set_last_run(report.metrics_evaluated, report.points, finished_at);
                if let Some(health) = &self.health {
                    health.record_successful_run(finished_at).await;
                }
                self.logger.log_run_completed(
                    report.points,
                    report.metrics_evaluated,
                    report.alerts.len(),
                    elapsed.as_millis() as u64,
                );
            }
            Err(_) => self.metrics.inc_run_failures(),
        }

        result
    }

    async fn execute(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let window = LookbackWindow::ending_at(now, self.config.bucket_width_secs, self.config.lookback_secs)?;
        self.logger
            .log_run_started(&window.start.to_rfc3339(), &window.end.to_rfc3339());

        let mut extracts = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let extract = source.fetch(&window).await;
            let extract = self.track(components::SOURCE, extract).await?;
            extracts.push(extract);
        }

        let table = self.track(components::EVALUATOR, TimeSeriesBuilder::merge(&extracts)).await?;
        if table.bucket_width_secs != self.config.bucket_width_secs {
            let err = AlertError::input_shape(format!(
                "extracts use {}s buckets, configured width is {}s",
                table.bucket_width_secs, self.config.bucket_width_secs
            ));
            return self.track(components::EVALUATOR, Err(err)).await;
        }

        let decisions = self.evaluator.evaluate(&table, &self.config.metrics);
        let decisions = self.track(components::EVALUATOR, decisions).await?;

        let mut alerts = Vec::with_capacity(decisions.len());
        for decision in &decisions {
            self.logger.log_anomaly(decision);
            let payload = self.payloads.build(decision);
            let delivered = self.notifier.notify(&payload).await;
            self.track(components::NOTIFIER, delivered).await?;
            self.metrics.inc_alerts();
            alerts.push(decision.metric_name.clone());
        }
        if decisions.is_empty() {
            self.mark_healthy(components::NOTIFIER).await;
        }

        Ok(RunReport {
            window,
            points: table.len(),
            metrics_evaluated: self.config.metrics.len(),
            alerts,
        })
    }

    /// Mirror a step's result into the health registry
    async fn track<T>(&self, component: &str, result: Result<T>) -> Result<T> {
        if let Some(health) = &self.health {
            match &result {
                Ok(_) => health.set_healthy(component).await,
                Err(e) => health.set_unhealthy(component, e.to_string()).await,
            }
        }
        result
    }

    async fn mark_healthy(&self, component: &str) {
        if let Some(health) = &self.health {
            health.set_healthy(component).await;
        }
    }
}
