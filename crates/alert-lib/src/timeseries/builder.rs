//! Outer join of per-source extracts into one wide table
//!
//! Every bucket present in any extract appears in the result. A metric with
//! no row for a bucket is scored as zero activity rather than left out.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use super::window::is_aligned;
use crate::error::{AlertError, Result};
use crate::models::{Extract, TimeSeriesPoint, UnifiedTable};

/// Value used for a metric that has no row in a bucket
pub const FILL_VALUE: f64 = 0.0;

/// Join keys and collected values of one bucket
struct BucketRow {
    date: NaiveDate,
    time_label: String,
    values: HashMap<String, f64>,
}

/// Merges source extracts into a [`UnifiedTable`]
pub struct TimeSeriesBuilder;

impl TimeSeriesBuilder {
    /// Outer-join `extracts` on `(timestamp, date, time_label)`
    ///
    /// Fails fast with [`AlertError::InputShape`] when the extracts cannot be
    /// joined unambiguously: differing bucket widths, conflicting join keys,
    /// misaligned or duplicate timestamps, or a metric column claimed twice.
    pub fn merge(extracts: &[Extract]) -> Result<UnifiedTable> {
        let first = extracts
            .first()
            .ok_or_else(|| AlertError::input_shape("no extracts to merge"))?;

        let bucket_width_secs = first.bucket_width_secs;
        if bucket_width_secs <= 0 {
            return Err(AlertError::input_shape(format!(
                "extract '{}' has non-positive bucket width {}s",
                first.name, bucket_width_secs
            )));
        }

        let metrics = Self::collect_metrics(extracts, bucket_width_secs)?;

        let mut buckets: BTreeMap<DateTime<Utc>, BucketRow> = BTreeMap::new();
        for extract in extracts {
            Self::absorb(extract, &mut buckets)?;
        }

        let points: Vec<TimeSeriesPoint> = buckets
            .into_iter()
            .map(|(timestamp, row)| TimeSeriesPoint {
                timestamp,
                date: row.date,
                time_label: row.time_label,
                metric_values: metrics
                    .iter()
                    .map(|m| (m.clone(), row.values.get(m).copied().unwrap_or(FILL_VALUE)))
                    .collect(),
            })
            .collect();

        debug!(
            extracts = extracts.len(),
            metrics = metrics.len(),
            points = points.len(),
            "Merged extracts"
        );

        Ok(UnifiedTable {
            bucket_width_secs,
            metrics,
            points,
        })
    }

    /// Check bucket widths and gather metric columns in declaration order
    fn collect_metrics(extracts: &[Extract], bucket_width_secs: i64) -> Result<Vec<String>> {
        let mut owners: HashMap<&str, &str> = HashMap::new();
        let mut metrics = Vec::new();

        for extract in extracts {
            if extract.bucket_width_secs != bucket_width_secs {
                return Err(AlertError::input_shape(format!(
                    "bucket width mismatch: '{}' uses {}s, '{}' uses {}s",
                    extracts[0].name,
                    bucket_width_secs,
                    extract.name,
                    extract.bucket_width_secs
                )));
            }

            for metric in &extract.metrics {
                if let Some(owner) = owners.insert(metric.as_str(), extract.name.as_str()) {
                    return Err(AlertError::input_shape(format!(
                        "metric '{}' is provided by both '{}' and '{}'",
                        metric, owner, extract.name
                    )));
                }
                metrics.push(metric.clone());
            }
        }

        Ok(metrics)
    }

    /// Fold one extract's rows into the bucket map
    fn absorb(extract: &Extract, buckets: &mut BTreeMap<DateTime<Utc>, BucketRow>) -> Result<()> {
        let declared: HashSet<&str> = extract.metrics.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();

        for row in &extract.rows {
            if !is_aligned(row.timestamp, extract.bucket_width_secs) {
                return Err(AlertError::input_shape(format!(
                    "extract '{}': timestamp {} is not aligned to {}s buckets",
                    extract.name, row.timestamp, extract.bucket_width_secs
                )));
            }
            if !seen.insert(row.timestamp) {
                return Err(AlertError::input_shape(format!(
                    "extract '{}': duplicate bucket {}",
                    extract.name, row.timestamp
                )));
            }

            if let Some(extra) = row.values.keys().find(|k| !declared.contains(k.as_str())) {
                return Err(AlertError::input_shape(format!(
                    "extract '{}': undeclared column '{}' at {}",
                    extract.name, extra, row.timestamp
                )));
            }
            for metric in &extract.metrics {
                match row.values.get(metric) {
                    None => {
                        return Err(AlertError::input_shape(format!(
                            "extract '{}': column '{}' missing at {}",
                            extract.name, metric, row.timestamp
                        )));
                    }
                    Some(v) if !v.is_finite() => {
                        return Err(AlertError::input_shape(format!(
                            "extract '{}': non-finite value for '{}' at {}",
                            extract.name, metric, row.timestamp
                        )));
                    }
                    Some(_) => {}
                }
            }

            let bucket = buckets.entry(row.timestamp).or_insert_with(|| BucketRow {
                date: row.date,
                time_label: row.time_label.clone(),
                values: HashMap::new(),
            });

            if bucket.date != row.date || bucket.time_label != row.time_label {
                return Err(AlertError::input_shape(format!(
                    "join key mismatch at {}: ({}, {}) vs ({}, {}) from '{}'",
                    row.timestamp, bucket.date, bucket.time_label, row.date, row.time_label, extract.name
                )));
            }

            bucket
                .values
                .extend(row.values.iter().map(|(k, v)| (k.clone(), *v)));
        }

        Ok(())
    }
}
