//! Time axis handling: bucket windows and the multi-source merge

mod builder;
mod window;

pub use builder::{TimeSeriesBuilder, FILL_VALUE};
pub use window::{bucket_keys, floor_to_bucket, is_aligned, LookbackWindow, DEFAULT_LOOKBACK_SECS};
