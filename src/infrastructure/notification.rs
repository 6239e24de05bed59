//! Notification adapters.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::ports::NotificationPort;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Sends messages to a Telegram chat. Delivery is best effort; failures
/// are logged and swallowed.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self::with_base(TELEGRAM_API_BASE, bot_token, chat_id)
    }

    pub fn with_base(
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        TelegramNotifier {
            client: Client::new(),
            api_base: api_base.into(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }
}

#[async_trait]
impl NotificationPort for TelegramNotifier {
    async fn notify(&self, message: &str) {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let body = json!({
            "chat_id": self.chat_id,
            "text": message,
        });
        let result = self.client.post(&url).json(&body).send().await;
        match result {
            Ok(response) if !response.status().is_success() => {
                warn!(status = %response.status(), "Telegram rejected notification");
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to send Telegram notification: {}", e);
            }
        }
    }
}

/// Fallback notifier that writes to the log stream, used when no
/// Telegram credentials are configured.
pub struct LogNotifier;

#[async_trait]
impl NotificationPort for LogNotifier {
    async fn notify(&self, message: &str) {
        info!(target: "notifications", "{}", message);
    }
}

/// Build the configured notifier.
pub fn notifier_from_config(config: &AppConfig) -> Arc<dyn NotificationPort> {
    match (&config.telegram_bot_token, &config.telegram_chat_id) {
        (Some(token), Some(chat_id)) => {
            info!("Telegram notifications enabled");
            Arc::new(TelegramNotifier::new(token, chat_id))
        }
        _ => {
            info!("Telegram credentials missing, notifications go to the log");
            Arc::new(LogNotifier)
        }
    }
}
