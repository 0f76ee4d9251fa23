//! Facebook Messenger channel (Graph API Send API).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{ChannelAdapter, ucfirst, value_to_text};
use crate::message::NotificationMessage;
use crate::response::NotificationResponse;
use crate::{Error, Result};

const GRAPH_API_URL: &str = "https://graph.facebook.com/v18.0/me/messages";

/// Messenger channel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessengerConfig {
    /// Page access token of the Facebook page sending the messages.
    #[serde(default)]
    pub page_access_token: String,
}

/// Facebook Messenger notification channel.
pub struct MessengerChannel {
    config: MessengerConfig,
    client: Client,
}

impl MessengerChannel {
    pub fn new(config: MessengerConfig) -> Self {
        crate::utils::http_client::install_rustls_provider();
        Self {
            config,
            client: Client::new(),
        }
    }

    fn format_message(&self, message: &NotificationMessage) -> String {
        let mut text = format!("{}\n\n{}", message.title, message.body);

        if !message.data.is_empty() {
            text.push_str("\n\nAdditional Info:");
            for (key, value) in &message.data {
                text.push_str(&format!(
                    "\n\u{2022} {}: {}",
                    ucfirst(key),
                    value_to_text(value)
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
        let response = self
            .client
            .post(GRAPH_API_URL)
            .bearer_auth(&self.config.page_access_token)
            .json(&json!({
                "recipient": { "id": recipient },
                "message": { "text": self.format_message(message) },
            }))
            .send()
            .await
            .map_err(|e| Error::Other(format!("Messenger request failed: {}", e)))?;

        let status = response.status();
        let json: Value = response.json().await.unwrap_or_default();

        if status.is_success() {
            let message_id = json
                .get("message_id")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            debug!(recipient = %recipient, message_id = %message_id, "Messenger message sent");
            return Ok(NotificationResponse::success(
                message_id,
                Some(json),
                Some("messenger".to_string()),
            ));
        }

        let error = json
            .pointer("/error/message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        warn!(recipient = %recipient, status = %status, error = %error, "Messenger send failed");
        Ok(NotificationResponse::failure(
            format!("Messenger API error: {}", error),
            Some(json),
            Some("messenger".to_string()),
        ))
    }
}

#[async_trait]
impl ChannelAdapter for MessengerChannel {
    fn name(&self) -> &'static str {
        "messenger"
    }

    fn is_configured(&self) -> bool {
        !self.config.page_access_token.is_empty()
    }

    /// Recipients are numeric page-scoped user ids (PSIDs).
    fn validate_recipient(&self, recipient: &str) -> bool {
        !recipient.is_empty() && recipient.bytes().all(|b| b.is_ascii_digit())
    }

    async fn send(
        &self,
        recipient: &str,
        message: &NotificationMessage,
    ) -> Result<NotificationResponse> {
        if !self.is_configured() {
            return Ok(NotificationResponse::failure(
                "Messenger channel not configured",
                None,
                Some("messenger".to_string()),
            ));
        }

        match self.deliver(recipient, message).await {
            Ok(response) => Ok(response),
            Err(e) => Ok(NotificationResponse::failure(
                e.to_string(),
                None,
                Some("messenger".to_string()),
            )),
        }
    }
}
