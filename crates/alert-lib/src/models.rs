//! Core data models for the alerting pipeline

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Default bucket width (15 minutes)
pub const DEFAULT_BUCKET_WIDTH_SECS: i64 = 15 * 60;

/// One bucketed row of a source extract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractRow {
    pub timestamp: DateTime<Utc>,
    pub date: NaiveDate,
    pub time_label: String,
    pub values: BTreeMap<String, f64>,
}

/// A per-source table of bucketed metric columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extract {
    pub name: String,
    #[serde(default = "default_bucket_width_secs")]
    pub bucket_width_secs: i64,
    /// Metric columns in declaration order
    pub metrics: Vec<String>,
    pub rows: Vec<ExtractRow>,
}

fn default_bucket_width_secs() -> i64 {
    DEFAULT_BUCKET_WIDTH_SECS
}

impl Extract {
    pub fn new(name: impl Into<String>, bucket_width_secs: i64, metrics: Vec<String>) -> Self {
        Self {
            name: name.into(),
            bucket_width_secs,
            metrics,
            rows: Vec::new(),
        }
    }

    /// Append a row whose display keys are derived from the timestamp
    pub fn push(&mut self, timestamp: DateTime<Utc>, values: BTreeMap<String, f64>) {
        let (date, time_label) = crate::timeseries::bucket_keys(timestamp);
        self.rows.push(ExtractRow {
            timestamp,
            date,
            time_label,
            values,
        });
    }
}

/// One row of the unified table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub date: NaiveDate,
    pub time_label: String,
    /// Every metric of the table has a value here; absent source data is 0
    pub metric_values: BTreeMap<String, f64>,
}

impl TimeSeriesPoint {
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.metric_values.get(metric).copied()
    }
}

/// Merged wide table with a shared, strictly increasing time axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedTable {
    pub bucket_width_secs: i64,
    pub metrics: Vec<String>,
    pub points: Vec<TimeSeriesPoint>,
}

impl UnifiedTable {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn has_metric(&self, metric: &str) -> bool {
        self.metrics.iter().any(|m| m == metric)
    }

    /// Extract a single metric column, ordered by timestamp
    pub fn series(&self, metric: &str) -> Option<MetricSeries> {
        if !self.has_metric(metric) {
            return None;
        }

        let points = self
            .points
            .iter()
            .map(|p| SeriesPoint {
                timestamp: p.timestamp,
                value: p.value(metric).unwrap_or(0.0),
            })
            .collect();

        Some(MetricSeries {
            name: metric.to_string(),
            points,
        })
    }

    /// Turn the table back into an extract so it can take part in another merge
    pub fn into_extract(self, name: impl Into<String>) -> Extract {
        let rows = self
            .points
            .into_iter()
            .map(|p| ExtractRow {
                timestamp: p.timestamp,
                date: p.date,
                time_label: p.time_label,
                values: p.metric_values,
            })
            .collect();

        Extract {
            name: name.into(),
            bucket_width_secs: self.bucket_width_secs,
            metrics: self.metrics,
            rows,
        }
    }
}

/// A single (timestamp, value) observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// One metric's values ordered by timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

impl MetricSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    /// The most recent observation
    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    /// The observation just before the most recent one
    pub fn previous(&self) -> Option<&SeriesPoint> {
        self.points.len().checked_sub(2).map(|i| &self.points[i])
    }
}
