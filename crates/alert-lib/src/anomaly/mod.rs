//! Anomaly detection for bucketed metric series
//!
//! This module provides:
//! - Rolling IQR bounds with lag-1 quantiles and centered smoothing
//! - Evaluation of a configured metric list against a unified table
//! - Notification payloads (message text and chart series) for breaches

mod detector;
mod evaluator;
mod payload;

pub use detector::{
    AnomalyDetector, Breach, Detection, DetectionOutcome, RollingBounds, DEFAULT_IQR_MULTIPLIER,
    DEFAULT_WINDOW_SIZE,
};
pub use evaluator::{AlertDecision, AlertEvaluator, RelativeChange};
pub use payload::{ChartSeries, NotificationPayload, NotificationPayloadBuilder};
