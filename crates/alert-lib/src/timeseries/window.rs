//! Lookback window and bucket arithmetic
//!
//! Buckets are epoch-aligned, fixed-width intervals. A run looks at the
//! trailing window that ends at the start of the current (still open) bucket.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AlertError, Result};

/// Default lookback (one day)
pub const DEFAULT_LOOKBACK_SECS: i64 = 24 * 60 * 60;

/// Truncate a timestamp to the start of its bucket
pub fn floor_to_bucket(ts: DateTime<Utc>, bucket_width_secs: i64) -> Option<DateTime<Utc>> {
    if bucket_width_secs <= 0 {
        return None;
    }
    let secs = ts.timestamp();
    DateTime::from_timestamp(secs - secs.rem_euclid(bucket_width_secs), 0)
}

/// Whether a timestamp sits exactly on a bucket boundary
pub fn is_aligned(ts: DateTime<Utc>, bucket_width_secs: i64) -> bool {
    bucket_width_secs > 0
        && ts.timestamp_subsec_nanos() == 0
        && ts.timestamp().rem_euclid(bucket_width_secs) == 0
}

/// Display keys of a bucket: calendar date and `HH:MM`
pub fn bucket_keys(ts: DateTime<Utc>) -> (NaiveDate, String) {
    (ts.date_naive(), ts.format("%H:%M").to_string())
}

/// Half-open interval `[start, end)` of buckets evaluated by one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookbackWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub bucket_width_secs: i64,
}

impl LookbackWindow {
    /// Window of `lookback_secs` ending at `now` truncated to the bucket width
    pub fn ending_at(now: DateTime<Utc>, bucket_width_secs: i64, lookback_secs: i64) -> Result<Self> {
        if bucket_width_secs <= 0 {
            return Err(AlertError::config(format!(
                "bucket width must be positive, got {}s",
                bucket_width_secs
            )));
        }
        if lookback_secs <= 0 {
            return Err(AlertError::config(format!(
                "lookback must be positive, got {}s",
                lookback_secs
            )));
        }

        let end = floor_to_bucket(now, bucket_width_secs)
            .ok_or_else(|| AlertError::config(format!("timestamp {} out of range", now)))?;
        let start = end
            .checked_sub_signed(Duration::seconds(lookback_secs))
            .ok_or_else(|| AlertError::config("lookback reaches before the representable range"))?;

        Ok(Self {
            start,
            end,
            bucket_width_secs,
        })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }

    /// Number of complete buckets the window can hold
    pub fn bucket_count(&self) -> usize {
        ((self.end - self.start).num_seconds() / self.bucket_width_secs).max(0) as usize
    }
}
