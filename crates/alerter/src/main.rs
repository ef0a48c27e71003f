//! Metric anomaly alerter
//!
//! Runs the extract → merge → detect → notify pipeline on a fixed interval
//! and serves health, readiness and Prometheus metrics over HTTP.

use alert_lib::{
    health::{components, HealthRegistry},
    notify::{LogNotifier, Notifier, TelegramNotifier},
    observability::{AlerterMetrics, StructuredLogger},
    source::{ExtractSource, JsonFileSource},
    Pipeline,
};
use anyhow::{bail, Result};
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod scheduler;

const ALERTER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "anomaly-alerter")]
#[command(about = "Rolling IQR anomaly alerting for bucketed product metrics")]
#[command(version)]
struct Args {
    /// Configuration file, overlaid with ALERTER_* environment variables
    #[arg(short, long, env = "ALERTER_CONFIG")]
    config: Option<PathBuf>,

    /// Run the pipeline once (with retries) and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let args = Args::parse();

    let config = config::AlerterConfig::load(args.config.as_deref())?;
    if config.sources.is_empty() {
        bail!("No extract sources configured");
    }
    info!(instance = %config.instance, sources = config.sources.len(), "Alerter configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::SOURCE).await;
    health_registry.register(components::EVALUATOR).await;
    health_registry.register(components::NOTIFIER).await;
    // Missing three consecutive scheduled runs degrades health
    health_registry
        .set_stale_after(3 * config.schedule_interval().as_secs() as i64)
        .await;

    let metrics = AlerterMetrics::new();

    let logger = StructuredLogger::new(&config.instance);
    logger.log_startup(ALERTER_VERSION, &config.metrics);

    let sources: Vec<Arc<dyn ExtractSource>> = config
        .sources
        .iter()
        .map(|s| Arc::new(JsonFileSource::new(s.name.clone(), s.path.clone())) as Arc<dyn ExtractSource>)
        .collect();

    let notifier: Arc<dyn Notifier> = match &config.telegram {
        Some(telegram) => Arc::new(TelegramNotifier::new(telegram.clone())?),
        None => {
            info!("No Telegram credentials configured, alerts are only logged");
            Arc::new(LogNotifier::new(logger.clone()))
        }
    };

    let pipeline = Pipeline::new(config.pipeline_config(), sources, notifier, logger.clone())?
        .with_health(health_registry.clone());

    let app_state = Arc::new(api::AppState::new(health_registry.clone(), metrics));
    let scheduler = scheduler::Scheduler::new(
        pipeline,
        config.schedule_interval(),
        scheduler::RetryPolicy {
            retries: config.retries,
            delay: config.retry_delay(),
        },
        logger.clone(),
        app_state.clone(),
    );

    if args.once {
        let report = scheduler.run_with_retries().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let scheduler_handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    let _ = shutdown_tx.send(());
    scheduler_handle.await?;
    api_handle.abort();
    info!("Shutting down");

    Ok(())
}
