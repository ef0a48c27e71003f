//! Extract sources
//!
//! A source hands the pipeline one already-bucketed table for the lookback
//! window. Querying and aggregating raw events belongs to the data store.

mod file;

pub use file::JsonFileSource;

use crate::error::Result;
use crate::models::Extract;
use crate::timeseries::LookbackWindow;

pub use async_trait::async_trait;

/// Trait for extract providers
#[async_trait]
pub trait ExtractSource: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    /// Fetch the extract rows that fall inside `window`
    async fn fetch(&self, window: &LookbackWindow) -> Result<Extract>;
}

/// Source backed by an extract held in memory
#[derive(Debug, Clone)]
pub struct StaticSource {
    extract: Extract,
}

impl StaticSource {
    pub fn new(extract: Extract) -> Self {
        Self { extract }
    }
}

#[async_trait]
impl ExtractSource for StaticSource {
    fn name(&self) -> &str {
        &self.extract.name
    }

    async fn fetch(&self, window: &LookbackWindow) -> Result<Extract> {
        Ok(restrict_to_window(self.extract.clone(), window))
    }
}

/// Drop rows outside the window
pub(crate) fn restrict_to_window(mut extract: Extract, window: &LookbackWindow) -> Extract {
    extract.rows.retain(|row| window.contains(row.timestamp));
    extract
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[tokio::test]
    async fn test_static_source_filters_window() {
        let now = Utc.with_ymd_and_hms(2024, 6, 2, 0, 7, 0).unwrap();
        let window = LookbackWindow::ending_at(now, 900, 3600).unwrap();

        let mut extract = Extract::new("feed", 900, vec!["views".to_string()]);
        for i in -6..=1 {
            let ts = window.end + Duration::seconds(i * 900);
            extract.push(ts, [("views".to_string(), 1.0)].into_iter().collect());
        }

        let source = StaticSource::new(extract);
        let fetched = source.fetch(&window).await.unwrap();

        assert_eq!(source.name(), "feed");
        assert_eq!(fetched.rows.len(), 4);
        assert!(fetched.rows.iter().all(|r| window.contains(r.timestamp)));
    }
}
