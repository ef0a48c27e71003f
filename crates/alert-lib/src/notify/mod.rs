//! Notification delivery
//!
//! The detection core only produces [`NotificationPayload`]s; notifiers turn
//! them into side effects. Delivery failures surface as
//! [`AlertError::Delivery`](crate::AlertError::Delivery) and are retried by
//! whoever schedules the run, never here.

mod log;
mod telegram;

pub use self::log::LogNotifier;
pub use telegram::{TelegramConfig, TelegramNotifier, DEFAULT_TELEGRAM_API};

use crate::anomaly::NotificationPayload;
use crate::error::Result;

pub use async_trait::async_trait;

/// Trait for notification transports
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one payload
    async fn notify(&self, payload: &NotificationPayload) -> Result<()>;
}
