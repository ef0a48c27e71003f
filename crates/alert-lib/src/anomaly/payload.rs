//! Notification payloads for flagged metrics
//!
//! Shapes a decision into message text plus the series an external renderer
//! needs to draw the chart. Nothing is rendered or delivered here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::evaluator::{AlertDecision, RelativeChange};

/// Lines to draw for one metric over the lookback window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub timestamps: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
    /// Y axis floor; metrics are non-negative counts
    pub y_min: f64,
}

/// Message and chart data handed to a notifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub metric_name: String,
    pub text: String,
    pub chart: ChartSeries,
}

/// Builds [`NotificationPayload`]s from alert decisions
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationPayloadBuilder;

impl NotificationPayloadBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, decision: &AlertDecision) -> NotificationPayload {
        NotificationPayload {
            metric_name: decision.metric_name.clone(),
            text: self.message(decision),
            chart: self.chart(decision),
        }
    }

    /// Fixed-template alert text
    pub fn message(&self, decision: &AlertDecision) -> String {
        let change = match decision.relative_change {
            RelativeChange::Ratio(_) => decision.relative_change.to_string(),
            RelativeChange::Undefined if decision.previous_value == Some(0.0) => {
                "n/a (previous value is 0)".to_string()
            }
            RelativeChange::Undefined => "n/a".to_string(),
        };

        format!(
            "Metric {}:\n current value {:.2}\n deviation from previous value {}",
            decision.metric_name, decision.current_value, change
        )
    }

    pub fn chart(&self, decision: &AlertDecision) -> ChartSeries {
        ChartSeries {
            title: decision.metric_name.clone(),
            x_label: "time".to_string(),
            y_label: decision.metric_name.clone(),
            timestamps: decision.series.timestamps(),
            values: decision.series.values(),
            upper: decision.bounds.upper.clone(),
            lower: decision.bounds.lower.clone(),
            y_min: 0.0,
        }
    }
}
