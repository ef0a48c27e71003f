//! Multi-metric evaluation loop
//!
//! Runs the detector over each configured metric of a unified table, in the
//! configured order, and keeps a decision only for metrics that breached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::detector::{AnomalyDetector, Breach, RollingBounds};
use crate::error::{AlertError, Result};
use crate::models::{MetricSeries, UnifiedTable};

/// `|current / previous|`, or undefined when there is no usable previous value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RelativeChange {
    Ratio(f64),
    Undefined,
}

impl RelativeChange {
    pub fn between(current: f64, previous: Option<f64>) -> Self {
        match previous {
            Some(prev) if prev != 0.0 => {
                let ratio = (current / prev).abs();
                if ratio.is_finite() {
                    RelativeChange::Ratio(ratio)
                } else {
                    RelativeChange::Undefined
                }
            }
            _ => RelativeChange::Undefined,
        }
    }

    pub fn ratio(&self) -> Option<f64> {
        match self {
            RelativeChange::Ratio(r) => Some(*r),
            RelativeChange::Undefined => None,
        }
    }
}

impl std::fmt::Display for RelativeChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelativeChange::Ratio(r) => write!(f, "{:.2}%", r * 100.0),
            RelativeChange::Undefined => write!(f, "n/a"),
        }
    }
}

/// A metric whose latest bucket fell outside its bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDecision {
    pub metric_name: String,
    /// Bucket that was evaluated
    pub timestamp: DateTime<Utc>,
    pub current_value: f64,
    pub previous_value: Option<f64>,
    pub relative_change: RelativeChange,
    pub breach: Breach,
    /// Full lookback series and its bounds, for charting
    pub series: MetricSeries,
    pub bounds: RollingBounds,
}

impl AlertDecision {
    pub fn upper_bound(&self) -> Option<f64> {
        self.bounds.last_upper()
    }

    pub fn lower_bound(&self) -> Option<f64> {
        self.bounds.last_lower()
    }
}

/// Evaluates a list of metrics against a unified table
#[derive(Debug, Clone, Default)]
pub struct AlertEvaluator {
    detector: AnomalyDetector,
}

impl AlertEvaluator {
    pub fn new(detector: AnomalyDetector) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    /// Evaluate `metric_names` in order, returning decisions for breaching metrics
    ///
    /// Every name must be a column of `table`; a missing metric is an input
    /// shape error and nothing is evaluated.
    pub fn evaluate(&self, table: &UnifiedTable, metric_names: &[String]) -> Result<Vec<AlertDecision>> {
        if let Some(missing) = metric_names.iter().find(|m| !table.has_metric(m)) {
            return Err(AlertError::input_shape(format!(
                "metric '{}' is not present in the unified table (columns: {})",
                missing,
                table.metrics.join(", ")
            )));
        }

        let mut decisions = Vec::new();
        for metric in metric_names {
            let series = table
                .series(metric)
                .ok_or_else(|| AlertError::input_shape(format!("metric '{}' vanished", metric)))?;

            if let Some(decision) = self.evaluate_series(series) {
                decisions.push(decision);
            }
        }

        Ok(decisions)
    }

    /// Run the detector on one series and build a decision if it breached
    pub fn evaluate_series(&self, series: MetricSeries) -> Option<AlertDecision> {
        let detection = self.detector.detect(&series);

        debug!(
            metric = %series.name,
            points = series.len(),
            outcome = ?detection.outcome,
            upper = ?detection.bounds.last_upper(),
            lower = ?detection.bounds.last_lower(),
            "Evaluated metric"
        );

        let breach = detection.breach()?;
        let current = *series.last()?;
        let previous_value = series.previous().map(|p| p.value);

        Some(AlertDecision {
            metric_name: series.name.clone(),
            timestamp: current.timestamp,
            current_value: current.value,
            previous_value,
            relative_change: RelativeChange::between(current.value, previous_value),
            breach,
            bounds: detection.bounds,
            series,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Extract, TimeSeriesPoint};
    use crate::timeseries::TimeSeriesBuilder;
    use chrono::{Duration, TimeZone};

    fn table(columns: &[(&str, &[f64])]) -> UnifiedTable {
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let len = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut extract = Extract::new("test", 900, columns.iter().map(|(m, _)| m.to_string()).collect());

        for i in 0..len {
            extract.push(
                start + Duration::seconds(i as i64 * 900),
                columns.iter().map(|(m, v)| (m.to_string(), v[i])).collect(),
            );
        }

        TimeSeriesBuilder::merge(&[extract]).unwrap()
    }

    fn names(metrics: &[&str]) -> Vec<String> {
        metrics.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn test_only_breaching_metrics_reported() {
        let table = table(&[
            ("views", &[10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 100.0]),
            ("likes", &[10.0, 12.0, 9.0, 11.0, 10.0, 10.0, 11.0]),
        ]);

        let decisions = AlertEvaluator::default()
            .evaluate(&table, &names(&["views", "likes"]))
            .unwrap();

        assert_eq!(decisions.len(), 1);
        let decision = &decisions[0];
        assert_eq!(decision.metric_name, "views");
        assert_eq!(decision.current_value, 100.0);
        assert_eq!(decision.previous_value, Some(10.0));
        assert_eq!(decision.relative_change, RelativeChange::Ratio(10.0));
        assert_eq!(decision.breach, Breach::Above);
        assert_eq!(decision.series.len(), 7);
        assert_eq!(decision.bounds.len(), 7);
        assert_eq!(decision.timestamp, table.points[6].timestamp);
    }

    #[test]
    fn test_decisions_follow_configured_order() {
        let spike: &[f64] = &[5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 50.0];
        let table = table(&[("a", spike), ("b", spike), ("c", spike)]);

        let decisions = AlertEvaluator::default()
            .evaluate(&table, &names(&["c", "a", "b"]))
            .unwrap();
        let order: Vec<_> = decisions.iter().map(|d| d.metric_name.as_str()).collect();

        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_calm_table_yields_no_decisions() {
        let table = table(&[
            ("users_feed", &[50.0, 52.0, 49.0, 51.0, 50.0, 50.0, 51.0, 50.0]),
            ("messages", &[7.0, 7.0, 7.0, 7.0, 7.0, 7.0, 7.0, 7.0]),
        ]);

        let decisions = AlertEvaluator::default()
            .evaluate(&table, &names(&["users_feed", "messages"]))
            .unwrap();
        assert!(decisions.is_empty());
    }

    #[test]
    fn test_missing_metric_is_input_shape_error() {
        let table = table(&[("views", &[1.0, 2.0])]);
        let err = AlertEvaluator::default()
            .evaluate(&table, &names(&["views", "likes"]))
            .unwrap_err();

        assert!(matches!(err, AlertError::InputShape(_)));
    }

    #[test]
    fn test_empty_table_does_not_alert() {
        let table = UnifiedTable {
            bucket_width_secs: 900,
            metrics: names(&["views"]),
            points: Vec::<TimeSeriesPoint>::new(),
        };

        let decisions = AlertEvaluator::default().evaluate(&table, &names(&["views"])).unwrap();
        assert!(decisions.is_empty());
    }

    #[test]
    fn test_relative_change_with_zero_previous() {
        let change = RelativeChange::between(5.0, Some(0.0));
        assert_eq!(change, RelativeChange::Undefined);
        assert_eq!(change.ratio(), None);
        assert_eq!(change.to_string(), "n/a");

        assert_eq!(RelativeChange::between(0.0, Some(0.0)), RelativeChange::Undefined);
        assert_eq!(RelativeChange::between(5.0, None), RelativeChange::Undefined);
    }

    #[test]
    fn test_relative_change_is_absolute_ratio() {
        assert_eq!(RelativeChange::between(-30.0, Some(10.0)), RelativeChange::Ratio(3.0));
        assert_eq!(RelativeChange::between(5.0, Some(4.0)).to_string(), "125.00%");
    }

    #[test]
    fn test_spike_after_zero_bucket_has_undefined_change() {
        let table = table(&[("messages", &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 5.0])]);
        let decisions = AlertEvaluator::default()
            .evaluate(&table, &names(&["messages"]))
            .unwrap();

        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].relative_change, RelativeChange::Undefined);
    }

    #[test]
    fn test_repeat_evaluation_is_identical() {
        let table = table(&[("views", &[3.0, 8.0, 1.0, 9.0, 4.0, 7.0, 2.0, 6.0, 40.0])]);
        let evaluator = AlertEvaluator::new(AnomalyDetector::new(1.5, 4).unwrap());

        let first = evaluator.evaluate(&table, &names(&["views"])).unwrap();
        let second = evaluator.evaluate(&table, &names(&["views"])).unwrap();
        assert_eq!(first, second);
    }
}
