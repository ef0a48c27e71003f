//! Dry-run evaluation of merged extracts

use std::path::PathBuf;

use alert_lib::anomaly::{AlertDecision, AlertEvaluator, AnomalyDetector, NotificationPayloadBuilder};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::commands::load_table;
use crate::output::{
    color_breach, format_value, print_info, print_json, print_success, render_table, OutputFormat,
};

/// Row for flagged metrics table
#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Bucket")]
    timestamp: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Lower")]
    lower: String,
    #[tabled(rename = "Upper")]
    upper: String,
    #[tabled(rename = "Change")]
    change: String,
    #[tabled(rename = "Breach")]
    breach: String,
}

/// JSON view of a flagged metric
#[derive(Serialize)]
struct AlertSummary<'a> {
    metric: &'a str,
    timestamp: DateTime<Utc>,
    current_value: f64,
    previous_value: Option<f64>,
    relative_change: Option<f64>,
    lower_bound: Option<f64>,
    upper_bound: Option<f64>,
    breach: String,
    text: String,
}

pub async fn evaluate(
    paths: &[PathBuf],
    metrics: Vec<String>,
    multiplier: f64,
    window: usize,
    format: OutputFormat,
) -> Result<()> {
    let detector =
        AnomalyDetector::new(multiplier, window).context("Invalid detector parameters")?;
    let table = load_table(paths).await?;

    let metrics = if metrics.is_empty() {
        table.metrics.clone()
    } else {
        metrics
    };

    let decisions = AlertEvaluator::new(detector)
        .evaluate(&table, &metrics)
        .context("Failed to evaluate metrics")?;
    let payloads = NotificationPayloadBuilder::new();

    match format {
        OutputFormat::Json => {
            let summaries: Vec<AlertSummary> = decisions
                .iter()
                .map(|d| summarize(d, payloads.message(d)))
                .collect();
            print_json(&summaries)?;
        }
        OutputFormat::Table => {
            if decisions.is_empty() {
                print_success(&format!(
                    "No anomalies across {} metrics ({} buckets)",
                    metrics.len(),
                    table.len()
                ));
                return Ok(());
            }

            let rows: Vec<AlertRow> = decisions
                .iter()
                .map(|d| AlertRow {
                    metric: d.metric_name.clone(),
                    timestamp: d.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                    value: format_value(Some(d.current_value)),
                    lower: format_value(d.lower_bound()),
                    upper: format_value(d.upper_bound()),
                    change: d.relative_change.to_string(),
                    breach: color_breach(d.breach),
                })
                .collect();

            println!(
                "{} ({} of {} metrics)",
                "Anomalies".bold(),
                decisions.len(),
                metrics.len()
            );
            println!("{}", render_table(&rows));

            for decision in &decisions {
                println!();
                print_info(&payloads.message(decision));
            }
        }
    }

    Ok(())
}

fn summarize(decision: &AlertDecision, text: String) -> AlertSummary<'_> {
    AlertSummary {
        metric: &decision.metric_name,
        timestamp: decision.timestamp,
        current_value: decision.current_value,
        previous_value: decision.previous_value,
        relative_change: decision.relative_change.ratio(),
        lower_bound: decision.lower_bound(),
        upper_bound: decision.upper_bound(),
        breach: decision.breach.to_string(),
        text,
    }
}
