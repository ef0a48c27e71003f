//! Notifier that writes payloads to the structured log

use super::{async_trait, Notifier};
use crate::anomaly::NotificationPayload;
use crate::error::Result;
use crate::observability::StructuredLogger;

/// Emits each payload as a structured `warn` event
#[derive(Clone)]
pub struct LogNotifier {
    logger: StructuredLogger,
}

impl LogNotifier {
    pub fn new(logger: StructuredLogger) -> Self {
        Self { logger }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, payload: &NotificationPayload) -> Result<()> {
        self.logger
            .log_notification(&payload.metric_name, &payload.text, payload.chart.values.len());
        Ok(())
    }
}
