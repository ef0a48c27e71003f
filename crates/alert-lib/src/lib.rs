//! Metric anomaly alerting library
//!
//! This crate provides the core functionality for:
//! - Merging bucketed per-source extracts into one time series table
//! - Rolling IQR anomaly detection on the latest bucket of each metric
//! - Alert decisions and notification payloads (message + chart series)
//! - Extract sources and notifiers behind narrow traits
//! - Health checks and observability

pub mod anomaly;
pub mod error;
pub mod health;
pub mod models;
pub mod notify;
pub mod observability;
pub mod pipeline;
pub mod source;
pub mod timeseries;

pub use error::{AlertError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{AlerterMetrics, StructuredLogger};
pub use pipeline::{Pipeline, PipelineConfig, RunReport, DEFAULT_METRICS};
