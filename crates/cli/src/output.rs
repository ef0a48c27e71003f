//! Output formatting utilities

use alert_lib::anomaly::{Breach, DetectionOutcome};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render rows as a rounded table
pub fn render_table<T: Tabled>(rows: &[T]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format an optional series value, `-` where undefined
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

/// Color a detection outcome
pub fn color_outcome(outcome: DetectionOutcome) -> String {
    match outcome {
        DetectionOutcome::Breach(breach) => color_breach(breach),
        DetectionOutcome::WithinBounds => "within bounds".green().to_string(),
        DetectionOutcome::InsufficientHistory => "insufficient history".yellow().to_string(),
    }
}

pub fn color_breach(breach: Breach) -> String {
    breach.to_string().red().bold().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(Some(14.0)), "14.00");
        assert_eq!(format_value(Some(-0.125)), "-0.12");
        assert_eq!(format_value(None), "-");
    }
}
