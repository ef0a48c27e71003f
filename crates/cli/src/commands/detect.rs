//! Ad hoc detector runs over a literal series

use alert_lib::anomaly::AnomalyDetector;
use anyhow::{Context, Result};
use colored::Colorize;
use tabled::Tabled;

use crate::output::{color_outcome, format_value, print_json, render_table, OutputFormat};

/// Row for the rolling bounds table
#[derive(Tabled)]
struct BoundsRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Q25")]
    q25: String,
    #[tabled(rename = "Q75")]
    q75: String,
    #[tabled(rename = "Lower")]
    lower: String,
    #[tabled(rename = "Upper")]
    upper: String,
}

/// Show the smoothed bounds for every index and the verdict for the last value
pub fn detect(values: &[f64], multiplier: f64, window: usize, format: OutputFormat) -> Result<()> {
    let detector =
        AnomalyDetector::new(multiplier, window).context("Invalid detector parameters")?;
    let detection = detector.detect_values(values);

    match format {
        OutputFormat::Json => print_json(&detection)?,
        OutputFormat::Table => {
            let bounds = &detection.bounds;
            let rows: Vec<BoundsRow> = values
                .iter()
                .enumerate()
                .map(|(i, v)| BoundsRow {
                    index: i,
                    value: format_value(Some(*v)),
                    q25: format_value(bounds.q25[i]),
                    q75: format_value(bounds.q75[i]),
                    lower: format_value(bounds.lower[i]),
                    upper: format_value(bounds.upper[i]),
                })
                .collect();

            println!(
                "{} (a = {}, n = {})",
                "Rolling IQR bounds".bold(),
                detector.multiplier(),
                detector.window_size()
            );
            println!("{}", render_table(&rows));
            println!("Verdict: {}", color_outcome(detection.outcome));
        }
    }

    Ok(())
}
