//! CLI command implementations

pub mod detect;
pub mod evaluate;
pub mod merge;

use std::path::PathBuf;

use alert_lib::source::JsonFileSource;
use alert_lib::{Extract, UnifiedTable};
use alert_lib::timeseries::TimeSeriesBuilder;
use anyhow::{Context, Result};

/// Load every extract file, named after its file stem
pub async fn load_extracts(paths: &[PathBuf]) -> Result<Vec<Extract>> {
    let mut extracts = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let extract = JsonFileSource::new(name, path.clone())
            .load()
            .await
            .with_context(|| format!("Failed to load extract {}", path.display()))?;
        extracts.push(extract);
    }
    Ok(extracts)
}

pub async fn load_table(paths: &[PathBuf]) -> Result<UnifiedTable> {
    let extracts = load_extracts(paths).await?;
    TimeSeriesBuilder::merge(&extracts).context("Failed to merge extracts")
}
