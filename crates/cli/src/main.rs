//! Metric anomaly alerter CLI
//!
//! Offline tools for checking extracts and detector settings without
//! running the scheduler or sending notifications.

mod commands;
mod output;

use std::path::PathBuf;

use alert_lib::anomaly::{DEFAULT_IQR_MULTIPLIER, DEFAULT_WINDOW_SIZE};
use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{detect, evaluate, merge};

/// Metric anomaly alerter CLI
#[derive(Parser)]
#[command(name = "alertctl")]
#[command(author, version, about = "Offline CLI for the IQR metric anomaly alerter", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the detector over a list of values and show the rolling bounds
    Detect {
        /// Comma separated series, oldest first
        #[arg(long, required = true, value_delimiter = ',', allow_negative_numbers = true)]
        values: Vec<f64>,

        /// IQR multiplier
        #[arg(short = 'a', long = "multiplier", default_value_t = DEFAULT_IQR_MULTIPLIER)]
        multiplier: f64,

        /// Rolling window size
        #[arg(short = 'n', long = "window", default_value_t = DEFAULT_WINDOW_SIZE)]
        window: usize,
    },

    /// Merge extract files into one unified table
    Merge {
        /// Extract JSON files
        #[arg(long = "extract", required = true, num_args = 1..)]
        extracts: Vec<PathBuf>,
    },

    /// Evaluate metrics of merged extracts and show the alerts that would be sent
    Evaluate {
        /// Extract JSON files
        #[arg(long = "extract", required = true, num_args = 1..)]
        extracts: Vec<PathBuf>,

        /// Metrics to evaluate (all merged metrics if omitted)
        #[arg(long = "metric")]
        metrics: Vec<String>,

        /// IQR multiplier
        #[arg(short = 'a', long = "multiplier", default_value_t = DEFAULT_IQR_MULTIPLIER)]
        multiplier: f64,

        /// Rolling window size
        #[arg(short = 'n', long = "window", default_value_t = DEFAULT_WINDOW_SIZE)]
        window: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Detect {
            values,
            multiplier,
            window,
        } => {
            detect::detect(&values, multiplier, window, cli.format)?;
        }
        Commands::Merge { extracts } => {
            merge::merge(&extracts, cli.format).await?;
        }
        Commands::Evaluate {
            extracts,
            metrics,
            multiplier,
            window,
        } => {
            evaluate::evaluate(&extracts, metrics, multiplier, window, cli.format).await?;
        }
    }

    Ok(())
}
