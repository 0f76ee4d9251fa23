//! Telegram channel (Bot API `sendMessage`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{ChannelAdapter, ucfirst, value_to_text};
use crate::message::NotificationMessage;
use crate::response::NotificationResponse;
use crate::{Error, Result};

/// Telegram channel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Telegram Bot API token.
    #[serde(default)]
    pub bot_token: String,
}

/// Telegram notification channel.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: Client,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        crate::utils::http_client::install_rustls_provider();
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Build the HTML-formatted message text.
    fn format_message(&self, message: &NotificationMessage) -> String {
        let mut text = format!(
            "<b>{}</b>\n\n{}",
            html_escape(&message.title),
            html_escape(&message.body)
        );

        if !message.data.is_empty() {
            text.push_str("\n\n<i>Additional Info:</i>");
            for (key, value) in &message.data {
                // A one-entry object is flattened to its inner key/value
                // pair so `{"status": {"state": "open"}}` renders as
                // "State: open".
                if let Value::Object(inner) = value {
                    if inner.len() == 1 {
                        if let Some((inner_key, inner_value)) = inner.iter().next() {
                            text.push_str(&format!(
                                "\n\u{2022} <i>{}</i>: {}",
                                html_escape(&ucfirst(inner_key.trim_matches(['\'', '"']))),
                                html_escape(&value_to_text(inner_value))
                            ));
                            continue;
                        }
                    }
                }

                text.push_str(&format!(
                    "\n\u{2022} <i>{}</i>: {}",
                    html_escape(&ucfirst(key)),
                    html_escape(&value_to_text(value))
                ));
            }
        }

        text
    }

    async fn deliver(
        &self,
        recipient: &str,
        message: &NotificationMessage,
    ) -> Result<NotificationResponse> {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.config.bot_token
        );
        let payload = json!({
            "chat_id": recipient,
            "text": self.format_message(message),
            "parse_mode": "HTML",
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Other(format!("Telegram request failed: {}", e)))?;

        let status = response.status();
        let json: Value = response.json().await.unwrap_or_default();

        if status.is_success() {
            let message_id = json
                .pointer("/result/message_id")
                .and_then(|v| v.as_i64())
                .map(|id| id.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            debug!(recipient = %recipient, message_id = %message_id, "Telegram message sent");
            return Ok(NotificationResponse::success(
                message_id,
                Some(json),
                Some("telegram".to_string()),
            ));
        }

        let error = json
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown Telegram API error")
            .to_string();
        warn!(recipient = %recipient, status = %status, error = %error, "Telegram send failed");
        Ok(NotificationResponse::failure(
            error,
            Some(json),
            Some("telegram".to_string()),
        ))
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn is_configured(&self) -> bool {
        !self.config.bot_token.is_empty()
    }

    fn validate_recipient(&self, recipient: &str) -> bool {
        is_chat_id(recipient) || recipient.starts_with('@')
    }

    async fn send(
        &self,
        recipient: &str,
        message: &NotificationMessage,
    ) -> Result<NotificationResponse> {
        if !self.is_configured() {
            return Ok(NotificationResponse::failure(
                "Telegram channel not configured",
                None,
                Some("telegram".to_string()),
            ));
        }

        if !self.validate_recipient(recipient) {
            return Ok(NotificationResponse::failure(
                "Invalid Telegram chat ID or username",
                None,
                Some("telegram".to_string()),
            ));
        }

        match self.deliver(recipient, message).await {
            Ok(response) => Ok(response),
            Err(e) => Ok(NotificationResponse::failure(
                e.to_string(),
                None,
                Some("telegram".to_string()),
            )),
        }
    }
}

/// Numeric chat id, including the negative ids of groups and channels.
fn is_chat_id(recipient: &str) -> bool {
    let digits = recipient.strip_prefix('-').unwrap_or(recipient);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Escape text for Telegram's HTML parse mode.
fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}
