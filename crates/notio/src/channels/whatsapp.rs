//! WhatsApp channel (Twilio Messages API with `whatsapp:` addressing).

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ChannelAdapter, ucfirst, value_to_text};
use crate::message::NotificationMessage;
use crate::response::NotificationResponse;
use crate::{Error, Result};

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{1,14}$").unwrap());

/// WhatsApp channel configuration (Twilio credentials).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    /// WhatsApp-enabled sending number, with or without the `whatsapp:`
    /// prefix.
    #[serde(default)]
    pub from_number: String,
}

/// WhatsApp notification channel.
pub struct WhatsAppChannel {
    config: WhatsAppConfig,
    client: Client,
}

impl WhatsAppChannel {
    pub fn new(config: WhatsAppConfig) -> Self {
        crate::utils::http_client::install_rustls_provider();
        Self {
            config,
            client: Client::new(),
        }
    }

    fn format_message(&self, message: &NotificationMessage) -> String {
        let mut text = format!("*{}*\n\n{}", message.title, message.body);

        if !message.data.is_empty() {
            text.push_str("\n\n_Additional Info:_");
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
        let to = with_whatsapp_prefix(recipient);
        let from = with_whatsapp_prefix(&self.config.from_number);
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.config.account_sid
        );
        let body = self.format_message(message);
        let params = [
            ("To", to.as_str()),
            ("From", from.as_str()),
            ("Body", body.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Other(format!("Twilio request failed: {}", e)))?;

        let status = response.status();
        let json: serde_json::Value = response.json().await.unwrap_or_default();

        if status.is_success() {
            let sid = json
                .get("sid")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string();
            debug!(recipient = %to, sid = %sid, "WhatsApp message sent");
            return Ok(NotificationResponse::success(
                sid,
                Some(json),
                Some("whatsapp".to_string()),
            ));
        }

        let error = json
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown Twilio API error")
            .to_string();
        warn!(recipient = %to, status = %status, error = %error, "WhatsApp send failed");
        Ok(NotificationResponse::failure(
            error,
            Some(json),
            Some("whatsapp".to_string()),
        ))
    }
}

#[async_trait]
impl ChannelAdapter for WhatsAppChannel {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    fn is_configured(&self) -> bool {
        !self.config.account_sid.is_empty()
            && !self.config.auth_token.is_empty()
            && !self.config.from_number.is_empty()
    }

    fn validate_recipient(&self, recipient: &str) -> bool {
        let phone = recipient.strip_prefix("whatsapp:").unwrap_or(recipient);
        PHONE_RE.is_match(phone)
    }

    async fn send(
        &self,
        recipient: &str,
        message: &NotificationMessage,
    ) -> Result<NotificationResponse> {
        if !self.is_configured() {
            return Ok(NotificationResponse::failure(
                "WhatsApp channel not configured",
                None,
                Some("whatsapp".to_string()),
            ));
        }

        if !self.validate_recipient(recipient) {
            return Ok(NotificationResponse::failure(
                "Invalid WhatsApp number format",
                None,
                Some("whatsapp".to_string()),
            ));
        }

        match self.deliver(recipient, message).await {
            Ok(response) => Ok(response),
            Err(e) => Ok(NotificationResponse::failure(
                e.to_string(),
                None,
                Some("whatsapp".to_string()),
            )),
        }
    }
}

fn with_whatsapp_prefix(number: &str) -> String {
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{}", number)
    }
}
