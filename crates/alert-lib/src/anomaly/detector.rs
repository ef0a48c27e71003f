//! Rolling IQR anomaly detection
//!
//! Bounds for bucket `i` come from the `n` buckets strictly before it:
//!
//! ```text
//! upper[i] = q75[i] + a * iqr[i]
//! lower[i] = q25[i] - a * iqr[i]
//! ```
//!
//! Both bounds are then smoothed with a centered moving average of the same
//! window, and only the most recent bucket is judged against them.

use serde::{Deserialize, Serialize};

use crate::error::{AlertError, Result};
use crate::models::MetricSeries;

/// Default IQR multiplier `a`
pub const DEFAULT_IQR_MULTIPLIER: f64 = 3.0;

/// Default rolling window size `n`
pub const DEFAULT_WINDOW_SIZE: usize = 5;

/// Detects out-of-bound values using lag-1 rolling interquartile ranges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyDetector {
    multiplier: f64,
    window_size: usize,
}

impl AnomalyDetector {
    /// Create a detector with IQR multiplier `a` and window size `n`
    pub fn new(multiplier: f64, window_size: usize) -> Result<Self> {
        if !multiplier.is_finite() || multiplier < 0.0 {
            return Err(AlertError::config(format!(
                "IQR multiplier must be a finite non-negative number, got {}",
                multiplier
            )));
        }
        if window_size == 0 {
            return Err(AlertError::config("window size must be at least 1"));
        }

        Ok(Self {
            multiplier,
            window_size,
        })
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Evaluate the latest point of a metric series
    pub fn detect(&self, series: &MetricSeries) -> Detection {
        self.detect_values(&series.values())
    }

    /// Evaluate the latest of `values` (ordered oldest first)
    pub fn detect_values(&self, values: &[f64]) -> Detection {
        let bounds = self.bounds(values);

        let outcome = match (values.last(), bounds.upper.last(), bounds.lower.last()) {
            (Some(&value), Some(&Some(upper)), Some(&Some(lower))) if !value.is_nan() => {
                if value > upper {
                    DetectionOutcome::Breach(Breach::Above)
                } else if value < lower {
                    DetectionOutcome::Breach(Breach::Below)
                } else {
                    DetectionOutcome::WithinBounds
                }
            }
            _ => DetectionOutcome::InsufficientHistory,
        };

        Detection { outcome, bounds }
    }

    /// Compute rolling bounds for every index of `values`
    pub fn bounds(&self, values: &[f64]) -> RollingBounds {
        let n = self.window_size;
        let a = self.multiplier;

        let mut q25 = Vec::with_capacity(values.len());
        let mut q75 = Vec::with_capacity(values.len());
        let mut window = Vec::with_capacity(n);

        for i in 0..values.len() {
            if i < n {
                q25.push(None);
                q75.push(None);
                continue;
            }

            // Lag-1: the point itself never enters its own window
            let history = &values[i - n..i];
            if history.iter().any(|v| !v.is_finite()) {
                q25.push(None);
                q75.push(None);
                continue;
            }

            window.clear();
            window.extend_from_slice(history);
            window.sort_by(|x, y| x.total_cmp(y));

            q25.push(Some(quantile(&window, 0.25)));
            q75.push(Some(quantile(&window, 0.75)));
        }

        let iqr: Vec<Option<f64>> = q25
            .iter()
            .zip(&q75)
            .map(|(lo, hi)| Some((*hi)? - (*lo)?))
            .collect();

        let raw_upper: Vec<Option<f64>> = q75
            .iter()
            .zip(&iqr)
            .map(|(q, r)| Some((*q)? + a * (*r)?))
            .collect();

        let raw_lower: Vec<Option<f64>> = q25
            .iter()
            .zip(&iqr)
            .map(|(q, r)| Some((*q)? - a * (*r)?))
            .collect();

        let upper = centered_mean(&raw_upper, n);
        let lower = centered_mean(&raw_lower, n);

        RollingBounds {
            q25,
            q75,
            iqr,
            raw_upper,
            raw_lower,
            upper,
            lower,
        }
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self {
            multiplier: DEFAULT_IQR_MULTIPLIER,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

/// Per-index rolling statistics; `None` marks an undefined value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RollingBounds {
    pub q25: Vec<Option<f64>>,
    pub q75: Vec<Option<f64>>,
    pub iqr: Vec<Option<f64>>,
    /// Bounds before smoothing
    pub raw_upper: Vec<Option<f64>>,
    pub raw_lower: Vec<Option<f64>>,
    /// Smoothed bounds used for the decision
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

impl RollingBounds {
    pub fn len(&self) -> usize {
        self.upper.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upper.is_empty()
    }

    pub fn last_upper(&self) -> Option<f64> {
        self.upper.last().copied().flatten()
    }

    pub fn last_lower(&self) -> Option<f64> {
        self.lower.last().copied().flatten()
    }
}

/// Side of the bound a value crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breach {
    Above,
    Below,
}

impl std::fmt::Display for Breach {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Breach::Above => write!(f, "above upper bound"),
            Breach::Below => write!(f, "below lower bound"),
        }
    }
}

/// Verdict for the latest point of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionOutcome {
    Breach(Breach),
    WithinBounds,
    /// Not enough prior points for a bound; never an alert
    InsufficientHistory,
}

/// Result of running the detector over one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub outcome: DetectionOutcome,
    pub bounds: RollingBounds,
}

impl Detection {
    pub fn is_alert(&self) -> bool {
        matches!(self.outcome, DetectionOutcome::Breach(_))
    }

    pub fn breach(&self) -> Option<Breach> {
        match self.outcome {
            DetectionOutcome::Breach(b) => Some(b),
            _ => None,
        }
    }
}

/// Quantile of sorted data with linear interpolation between order statistics
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Centered moving average that shrinks at the edges and skips undefined values
fn centered_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let offset = (window - 1) / 2;
    let len = values.len();

    (0..len)
        .map(|i| {
            let end = (i + 1 + offset).min(len);
            let start = (i + 1 + offset).saturating_sub(window);
            pivoted_mean(values[start..end].iter().flatten().copied())
        })
        .collect()
}

/// Mean taken relative to the first value, so equal inputs average back exactly
fn pivoted_mean(mut values: impl Iterator<Item = f64>) -> Option<f64> {
    let pivot = values.next()?;
    let (sum, count) = values.fold((0.0, 1usize), |(sum, count), v| (sum + (v - pivot), count + 1));
    Some(pivot + sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_history_then_spike_alerts() {
        let detector = AnomalyDetector::default();
        let detection = detector.detect_values(&[10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 100.0]);

        assert!(detection.is_alert());
        assert_eq!(detection.outcome, DetectionOutcome::Breach(Breach::Above));
        assert_eq!(detection.bounds.last_upper(), Some(10.0));
        assert_eq!(detection.bounds.last_lower(), Some(10.0));
    }

    #[test]
    fn test_mild_variation_does_not_alert() {
        let detector = AnomalyDetector::default();
        let detection = detector.detect_values(&[10.0, 12.0, 9.0, 11.0, 10.0, 10.0, 11.0]);

        assert_eq!(detection.outcome, DetectionOutcome::WithinBounds);
        assert_eq!(detection.bounds.q25[6], Some(10.0));
        assert_eq!(detection.bounds.q75[6], Some(11.0));
        assert_eq!(detection.bounds.last_upper(), Some(14.0));
        assert_eq!(detection.bounds.last_lower(), Some(7.0));
    }

    #[test]
    fn test_drop_below_lower_bound() {
        let detector = AnomalyDetector::default();
        let detection = detector.detect_values(&[10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 0.0]);

        assert_eq!(detection.breach(), Some(Breach::Below));
    }

    #[test]
    fn test_insufficient_history() {
        let detector = AnomalyDetector::default();

        for len in 0..=5 {
            let values = vec![1000.0; len];
            let detection = detector.detect_values(&values);
            assert_eq!(detection.outcome, DetectionOutcome::InsufficientHistory);
            assert!(!detection.is_alert());
        }
    }

    #[test]
    fn test_first_n_raw_bounds_undefined() {
        let detector = AnomalyDetector::default();
        let bounds = detector.bounds(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);

        assert!(bounds.raw_upper[..5].iter().all(Option::is_none));
        assert!(bounds.raw_upper[5..].iter().all(Option::is_some));
    }

    #[test]
    fn test_current_point_excluded_from_its_bound() {
        let detector = AnomalyDetector::default();
        let calm = detector.bounds(&[5.0, 6.0, 7.0, 6.0, 5.0, 6.0, 6.0]);
        let spiked = detector.bounds(&[5.0, 6.0, 7.0, 6.0, 5.0, 6.0, 9000.0]);

        assert_eq!(calm.raw_upper, spiked.raw_upper);
        assert_eq!(calm.upper, spiked.upper);
    }

    #[test]
    fn test_smoothing_shrinks_at_edges() {
        let detector = AnomalyDetector::default();
        let bounds = detector.bounds(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);

        assert_eq!(bounds.raw_upper[5], Some(10.0));
        assert_eq!(bounds.raw_upper[6], Some(11.0));

        // Index 2 only sees raw values 0..=4, all undefined
        assert_eq!(bounds.upper[2], None);
        assert_eq!(bounds.upper[3], Some(10.0));
        assert_eq!(bounds.upper[5], Some(10.5));
        assert_eq!(bounds.upper[6], Some(10.5));
        assert_eq!(bounds.lower[6], Some(-3.5));
    }

    #[test]
    fn test_quantile_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.25), 1.75);
        assert_eq!(quantile(&sorted, 0.75), 3.25);
        assert_eq!(quantile(&[42.0], 0.25), 42.0);
    }

    #[test]
    fn test_even_window_centering() {
        let values = [Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)];
        // Window 4 at index 2 spans indices 0..=3
        assert_eq!(centered_mean(&values, 4)[2], Some(2.5));
        // Window 4 at index 4 spans indices 2..=4
        assert_eq!(centered_mean(&values, 4)[4], Some(4.0));
    }

    #[test]
    fn test_window_of_one() {
        let detector = AnomalyDetector::new(3.0, 1).unwrap();
        let detection = detector.detect_values(&[4.0, 4.0, 5.0]);

        // Single-value windows have zero spread, so any change breaches
        assert_eq!(detection.outcome, DetectionOutcome::Breach(Breach::Above));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(AnomalyDetector::new(3.0, 0).is_err());
        assert!(AnomalyDetector::new(-1.0, 5).is_err());
        assert!(AnomalyDetector::new(f64::NAN, 5).is_err());
        assert!(AnomalyDetector::new(0.0, 5).is_ok());
    }

    #[test]
    fn test_nan_latest_value_is_not_an_alert() {
        let detector = AnomalyDetector::default();
        let detection = detector.detect_values(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, f64::NAN]);
        assert_eq!(detection.outcome, DetectionOutcome::InsufficientHistory);
    }

    #[test]
    fn test_nan_in_history_leaves_bound_undefined() {
        let detector = AnomalyDetector::default();
        let detection = detector.detect_values(&[1.0, 1.0, 1.0, 1.0, f64::NAN, 1.0, 100.0]);

        assert_eq!(detection.bounds.q25[5], None);
        assert_eq!(detection.bounds.q75[6], None);
        assert_eq!(detection.bounds.last_upper(), None);
        assert_eq!(detection.outcome, DetectionOutcome::InsufficientHistory);
        assert!(!detection.is_alert());
    }

    #[test]
    fn test_infinite_history_value_leaves_bound_undefined() {
        let detector = AnomalyDetector::new(3.0, 2).unwrap();
        let bounds = detector.bounds(&[1.0, f64::INFINITY, 1.0, 1.0, 1.0]);

        assert_eq!(bounds.q25[2], None);
        assert_eq!(bounds.q25[3], None);
        assert_eq!(bounds.q25[4], Some(1.0));
    }
}
