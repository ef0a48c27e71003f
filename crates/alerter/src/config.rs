//! Alerter configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use alert_lib::notify::TelegramConfig;
use alert_lib::{PipelineConfig, DEFAULT_METRICS};
use anyhow::{Context, Result};
use serde::Deserialize;

/// One extract file to read on every run
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub path: PathBuf,
}

/// Alerter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AlerterConfig {
    /// Instance name used in logs
    #[serde(default = "default_instance")]
    pub instance: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Metrics to evaluate, in notification order
    #[serde(default = "default_metrics")]
    pub metrics: Vec<String>,

    #[serde(default = "default_bucket_width")]
    pub bucket_width_secs: i64,

    #[serde(default = "default_lookback")]
    pub lookback_secs: i64,

    #[serde(default = "default_iqr_multiplier")]
    pub iqr_multiplier: f64,

    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Pipeline cadence in seconds
    #[serde(default = "default_schedule_interval")]
    pub schedule_interval_secs: u64,

    /// Whole-run retries after a failed run
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// Telegram delivery; payloads are only logged when absent
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
}

fn default_instance() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "metric-alerter".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_metrics() -> Vec<String> {
    DEFAULT_METRICS.iter().map(|m| m.to_string()).collect()
}

fn default_bucket_width() -> i64 {
    alert_lib::DEFAULT_BUCKET_WIDTH_SECS
}

fn default_lookback() -> i64 {
    alert_lib::timeseries::DEFAULT_LOOKBACK_SECS
}

fn default_iqr_multiplier() -> f64 {
    alert_lib::anomaly::DEFAULT_IQR_MULTIPLIER
}

fn default_window_size() -> usize {
    alert_lib::anomaly::DEFAULT_WINDOW_SIZE
}

fn default_schedule_interval() -> u64 {
    15 * 60
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5 * 60
}

impl AlerterConfig {
    /// Load configuration from an optional file overlaid with `ALERTER_*` environment variables
    ///
    /// Nested keys use `__` (`ALERTER_TELEGRAM__CHAT_ID`), `ALERTER_METRICS`
    /// is a comma separated list.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("ALERTER")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("metrics")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            metrics: self.metrics.clone(),
            bucket_width_secs: self.bucket_width_secs,
            lookback_secs: self.lookback_secs,
            iqr_multiplier: self.iqr_multiplier,
            window_size: self.window_size,
        }
    }

    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_interval_secs.max(1))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}
