//! Merge extract files into one table

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use tabled::{builder::Builder, settings::Style};

use crate::commands::load_table;
use crate::output::{format_value, print_json, print_warning, OutputFormat};

pub async fn merge(paths: &[PathBuf], format: OutputFormat) -> Result<()> {
    let table = load_table(paths).await?;

    match format {
        OutputFormat::Json => print_json(&table)?,
        OutputFormat::Table => {
            println!(
                "{} ({} buckets of {}s, {} metrics)",
                "Unified table".bold(),
                table.len(),
                table.bucket_width_secs,
                table.metrics.len()
            );

            if table.is_empty() {
                print_warning("Extracts contain no rows");
                return Ok(());
            }

            let mut builder = Builder::default();
            let mut header = vec!["Timestamp".to_string(), "Date".to_string(), "Time".to_string()];
            header.extend(table.metrics.iter().cloned());
            builder.push_record(header);

            for point in &table.points {
                let mut record = vec![
                    point.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                    point.date.to_string(),
                    point.time_label.clone(),
                ];
                record.extend(table.metrics.iter().map(|m| format_value(point.value(m))));
                builder.push_record(record);
            }

            println!("{}", builder.build().with(Style::rounded()));
        }
    }

    Ok(())
}
