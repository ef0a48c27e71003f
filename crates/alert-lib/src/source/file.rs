//! JSON file extract source

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{async_trait, restrict_to_window, ExtractSource};
use crate::error::{AlertError, Result};
use crate::models::Extract;
use crate::timeseries::LookbackWindow;

/// Reads a serialized [`Extract`] from disk on every fetch
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    name: String,
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the whole file without window filtering
    pub async fn load(&self) -> Result<Extract> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| AlertError::source(&self.name, format!("{}: {}", self.path.display(), e)))?;

        let mut extract: Extract = serde_json::from_str(&content)
            .map_err(|e| AlertError::source(&self.name, format!("{}: {}", self.path.display(), e)))?;
        extract.name = self.name.clone();

        Ok(extract)
    }
}

#[async_trait]
impl ExtractSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, window: &LookbackWindow) -> Result<Extract> {
        let extract = self.load().await?;
        let total = extract.rows.len();
        let extract = restrict_to_window(extract, window);

        debug!(
            source = %self.name,
            path = %self.path.display(),
            rows = extract.rows.len(),
            dropped = total - extract.rows.len(),
            "Loaded extract"
        );

        Ok(extract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    const EXTRACT_JSON: &str = r#"{
        "name": "ignored",
        "bucket_width_secs": 900,
        "metrics": ["users_message", "messages"],
        "rows": [
            {"timestamp": "2024-06-01T23:30:00Z", "date": "2024-06-01", "time_label": "23:30",
             "values": {"users_message": 3, "messages": 12}},
            {"timestamp": "2024-06-01T23:45:00Z", "date": "2024-06-01", "time_label": "23:45",
             "values": {"users_message": 4, "messages": 15}},
            {"timestamp": "2024-06-02T00:00:00Z", "date": "2024-06-02", "time_label": "00:00",
             "values": {"users_message": 2, "messages": 6}}
        ]
    }"#;

    #[tokio::test]
    async fn test_fetch_parses_and_filters() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("messages.json");
        tokio::fs::write(&path, EXTRACT_JSON).await.unwrap();

        let source = JsonFileSource::new("message_actions", &path);
        let now = Utc.with_ymd_and_hms(2024, 6, 2, 0, 5, 0).unwrap();
        let window = LookbackWindow::ending_at(now, 900, 86_400).unwrap();

        let extract = source.fetch(&window).await.unwrap();

        assert_eq!(extract.name, "message_actions");
        assert_eq!(extract.metrics, vec!["users_message", "messages"]);
        // The 00:00 bucket is still open at 00:05
        assert_eq!(extract.rows.len(), 2);
        assert_eq!(extract.rows[1].values["messages"], 15.0);
    }

    #[tokio::test]
    async fn test_missing_file_is_source_error() {
        let dir = TempDir::new().unwrap();
        let source = JsonFileSource::new("feed", dir.path().join("absent.json"));

        let err = source.load().await.unwrap_err();
        assert!(matches!(err, AlertError::Source { ref source_name, .. } if source_name == "feed"));
    }

    #[tokio::test]
    async fn test_malformed_file_is_source_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let err = JsonFileSource::new("feed", &path).load().await.unwrap_err();
        assert!(err.to_string().contains("source 'feed' failed"));
    }
}
