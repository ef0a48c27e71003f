//! Telegram Bot API notifier
//!
//! Sends the alert text with `sendMessage`, then the chart series as a JSON
//! document with `sendDocument` so a renderer on the receiving side (or a
//! human) can plot it.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{async_trait, Notifier};
use crate::anomaly::NotificationPayload;
use crate::error::{AlertError, Result};

/// Public Bot API endpoint
pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Telegram delivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    DEFAULT_TELEGRAM_API.to_string()
}

/// Bot API response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Delivers payloads to a Telegram chat
pub struct TelegramNotifier {
    client: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self> {
        if config.bot_token.is_empty() || config.chat_id.is_empty() {
            return Err(AlertError::config("telegram bot_token and chat_id are required"));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AlertError::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token,
            method
        )
    }

    async fn send_message(&self, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": text,
        });

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| AlertError::Delivery(format!("sendMessage: {}", e.without_url())))?;

        check_response("sendMessage", response).await
    }

    async fn send_chart(&self, payload: &NotificationPayload) -> Result<()> {
        let chart = serde_json::to_vec_pretty(&payload.chart)
            .map_err(|e| AlertError::Delivery(format!("failed to encode chart: {}", e)))?;

        let part = Part::bytes(chart)
            .file_name(format!("chart_{}.json", payload.metric_name))
            .mime_str("application/json")
            .map_err(|e| AlertError::Delivery(format!("sendDocument: {}", e.without_url())))?;

        let form = Form::new()
            .text("chat_id", self.config.chat_id.clone())
            .text("caption", payload.metric_name.clone())
            .part("document", part);

        let response = self
            .client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AlertError::Delivery(format!("sendDocument: {}", e.without_url())))?;

        check_response("sendDocument", response).await
    }
}

/// Turn a non-2xx status or `"ok": false` into a delivery error
async fn check_response(method: &str, response: reqwest::Response) -> Result<()> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed: Option<ApiResponse> = serde_json::from_str(&body).ok();

    match parsed {
        Some(api) if status.is_success() && api.ok => Ok(()),
        Some(api) => Err(AlertError::Delivery(format!(
            "{} returned {}: {}",
            method,
            status,
            api.description.unwrap_or_else(|| "no description".to_string())
        ))),
        None => Err(AlertError::Delivery(format!(
            "{} returned {} with unreadable body",
            method, status
        ))),
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, payload: &NotificationPayload) -> Result<()> {
        self.send_message(&payload.text).await?;
        self.send_chart(payload).await?;

        debug!(
            metric = %payload.metric_name,
            chat_id = %self.config.chat_id,
            "Delivered Telegram notification"
        );
        Ok(())
    }
}
