//! Interval scheduling with whole-run retries

use std::sync::Arc;
use std::time::Duration;

use alert_lib::{Pipeline, RunReport, StructuredLogger};
use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::api::AppState;

/// Retries of a failed run as a whole, with a fixed delay between attempts
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

pub struct Scheduler {
    pipeline: Pipeline,
    interval: Duration,
    retry: RetryPolicy,
    logger: StructuredLogger,
    state: Arc<AppState>,
}

impl Scheduler {
    pub fn new(
        pipeline: Pipeline,
        interval: Duration,
        retry: RetryPolicy,
        logger: StructuredLogger,
        state: Arc<AppState>,
    ) -> Self {
        Self {
            pipeline,
            interval,
            retry,
            logger,
            state,
        }
    }

    /// Run the pipeline, retrying the whole run until it succeeds or attempts run out
    pub async fn run_with_retries(&self) -> alert_lib::Result<RunReport> {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 1;

        loop {
            match self.pipeline.run_once(Utc::now()).await {
                Ok(report) => {
                    self.state.record_report(report.clone()).await;
                    return Ok(report);
                }
                Err(e) => {
                    self.logger
                        .log_run_failed(attempt, max_attempts, &e.to_string());
                    if attempt >= max_attempts {
                        return Err(e);
                    }

                    self.logger
                        .log_retry_scheduled(attempt + 1, self.retry.delay.as_secs());
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Run on every interval tick until shutdown; the first tick fires immediately
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = self.interval.as_secs(), "Scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tokio::select! {
                        result = self.run_with_retries() => {
                            if let Err(e) = result {
                                error!(error = %e, "Run failed after all retries, waiting for next tick");
                            }
                        }
                        _ = shutdown.recv() => break,
                    }
                }
                _ = shutdown.recv() => break,
            }
        }

        info!("Scheduler stopped");
    }
}
