//! CLI integration tests

use std::io::Write;
use std::process::{Command, Output};

use tempfile::NamedTempFile;

fn alertctl(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_alertctl"))
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Extract with one row per 15 minutes starting at midnight
fn extract_file(metric: &str, values: &[f64]) -> NamedTempFile {
    let rows: Vec<serde_json::Value> = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let minutes = i * 15;
            serde_json::json!({
                "timestamp": format!("2024-03-01T{:02}:{:02}:00Z", minutes / 60, minutes % 60),
                "date": "2024-03-01",
                "time_label": format!("{:02}:{:02}", minutes / 60, minutes % 60),
                "values": { metric: v },
            })
        })
        .collect();
    let extract = serde_json::json!({
        "name": metric,
        "bucket_width_secs": 900,
        "metrics": [metric],
        "rows": rows,
    });

    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, "{}", extract).unwrap();
    file
}

fn path(file: &NamedTempFile) -> &str {
    file.path().to_str().unwrap()
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = alertctl(&["--help"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("IQR metric anomaly alerter"), "Should show about text");
    assert!(stdout.contains("detect"), "Should show detect command");
    assert!(stdout.contains("merge"), "Should show merge command");
    assert!(stdout.contains("evaluate"), "Should show evaluate command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = alertctl(&["--version"]);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout(&output).contains("alertctl"), "Should show binary name");
}

#[test]
fn test_detect_spike_json() {
    let output = alertctl(&["detect", "--values", "10,10,10,10,10,10,100", "--format", "json"]);
    assert!(output.status.success());

    let detection: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(detection["outcome"]["breach"], "above");
    assert_eq!(detection["bounds"]["upper"][6], 10.0);
    assert!(detection["bounds"]["upper"][0].is_null());
}

#[test]
fn test_detect_table_verdict() {
    let output = alertctl(&["detect", "--values", "10,12,9,11,10,10,11", "-a", "3", "-n", "5"]);
    assert!(output.status.success());

    let stdout = stdout(&output);
    assert!(stdout.contains("Verdict: within bounds"));
    assert!(stdout.contains("14.00"));
}

#[test]
fn test_detect_nan_history_is_not_an_alert() {
    let output = alertctl(&["detect", "--values", "1,1,1,1,NaN,1,100", "--format", "json"]);
    assert!(output.status.success());

    let detection: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(detection["outcome"], "insufficient_history");
    assert!(detection["bounds"]["upper"][6].is_null());
}

#[test]
fn test_detect_rejects_zero_window() {
    let output = alertctl(&["detect", "--values", "1,2,3", "-n", "0"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid detector parameters"));
}

#[test]
fn test_merge_fills_missing_with_zero() {
    let views = extract_file("views", &[5.0, 6.0, 7.0]);
    let messages = extract_file("messages", &[1.0]);

    let output = alertctl(&[
        "merge",
        "--extract",
        path(&views),
        path(&messages),
        "--format",
        "json",
    ]);
    assert!(output.status.success());

    let table: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let points = table["points"].as_array().unwrap();
    assert_eq!(points.len(), 3);
    assert_eq!(points[0]["metric_values"]["messages"], 1.0);
    assert_eq!(points[2]["metric_values"]["messages"], 0.0);
    assert_eq!(points[2]["metric_values"]["views"], 7.0);
}

#[test]
fn test_merge_rejects_duplicate_metric() {
    let first = extract_file("views", &[5.0]);
    let second = extract_file("views", &[6.0]);

    let output = alertctl(&["merge", "--extract", path(&first), path(&second)]);

    assert!(!output.status.success());
}

#[test]
fn test_evaluate_reports_spike() {
    let views = extract_file("views", &[10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 100.0]);
    let likes = extract_file("likes", &[3.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0]);

    let output = alertctl(&[
        "evaluate",
        "--extract",
        path(&views),
        path(&likes),
        "--format",
        "json",
    ]);
    assert!(output.status.success());

    let alerts: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let alerts = alerts.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["metric"], "views");
    assert_eq!(alerts[0]["relative_change"], 10.0);
    assert!(alerts[0]["text"]
        .as_str()
        .unwrap()
        .contains("deviation from previous value 1000.00%"));
}

#[test]
fn test_evaluate_unknown_metric_fails() {
    let views = extract_file("views", &[10.0, 11.0]);

    let output = alertctl(&["evaluate", "--extract", path(&views), "--metric", "likes"]);

    assert!(!output.status.success());
}

#[test]
fn test_evaluate_calm_table() {
    let views = extract_file("views", &[10.0, 12.0, 9.0, 11.0, 10.0, 10.0, 11.0]);

    let output = alertctl(&["evaluate", "--extract", path(&views)]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("No anomalies across 1 metrics"));
}
