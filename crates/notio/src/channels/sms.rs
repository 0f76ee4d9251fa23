//! SMS channel (Twilio Messages API).

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ChannelAdapter;
use crate::message::NotificationMessage;
use crate::response::NotificationResponse;
use crate::{Error, Result};

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{1,14}$").unwrap());

/// SMS channel configuration (Twilio credentials).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmsConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    /// Sending number in E.164 form.
    #[serde(default)]
    pub from_number: String,
}

/// SMS notification channel.
pub struct SmsChannel {
    config: SmsConfig,
    client: Client,
}

impl SmsChannel {
    pub fn new(config: SmsConfig) -> Self {
        crate::utils::http_client::install_rustls_provider();
        Self {
            config,
            client: Client::new(),
        }
    }

    fn format_message(&self, message: &NotificationMessage) -> String {
        let mut text = message.title.clone();
        if !message.body.is_empty() {
            text.push_str("\n\n");
            text.push_str(&message.body);
        }
        text
    }

    async fn deliver(
        &self,
        recipient: &str,
        message: &NotificationMessage,
    ) -> Result<NotificationResponse> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.config.account_sid
        );
        let body = self.format_message(message);
        let params = [
            ("To", recipient),
            ("From", self.config.from_number.as_str()),
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
            debug!(recipient = %recipient, sid = %sid, "SMS sent");
            return Ok(NotificationResponse::success(
                sid,
                Some(json),
                Some("sms".to_string()),
            ));
        }

        let error = json
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown Twilio API error")
            .to_string();
        warn!(recipient = %recipient, status = %status, error = %error, "SMS send failed");
        Ok(NotificationResponse::failure(
            error,
            Some(json),
            Some("sms".to_string()),
        ))
    }
}

#[async_trait]
impl ChannelAdapter for SmsChannel {
    fn name(&self) -> &'static str {
        "sms"
    }

    fn is_configured(&self) -> bool {
        !self.config.account_sid.is_empty()
            && !self.config.auth_token.is_empty()
            && !self.config.from_number.is_empty()
    }

    fn validate_recipient(&self, recipient: &str) -> bool {
        PHONE_RE.is_match(recipient)
    }

    async fn send(
        &self,
        recipient: &str,
        message: &NotificationMessage,
    ) -> Result<NotificationResponse> {
        if !self.is_configured() {
            return Ok(NotificationResponse::failure(
                "SMS channel not configured",
                None,
                Some("sms".to_string()),
            ));
        }

        if !self.validate_recipient(recipient) {
            return Ok(NotificationResponse::failure(
                "Invalid phone number format",
                None,
                Some("sms".to_string()),
            ));
        }

        match self.deliver(recipient, message).await {
            Ok(response) => Ok(response),
            Err(e) => Ok(NotificationResponse::failure(
                e.to_string(),
                None,
                Some("sms".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> SmsConfig {
        SmsConfig {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from_number: "+15005550006".to_string(),
        }
    }

    #[test]
    fn test_is_configured_requires_all_fields() {
        assert!(SmsChannel::new(configured()).is_configured());

        let mut partial = configured();
        partial.from_number = String::new();
        assert!(!SmsChannel::new(partial).is_configured());
    }

    #[test]
    fn test_validate_recipient() {
        let channel = SmsChannel::new(configured());
        assert!(channel.validate_recipient("+12025550123"));
        assert!(channel.validate_recipient("12025550123"));
        assert!(channel.validate_recipient("49"));
        assert!(!channel.validate_recipient("0123456"));
        assert!(!channel.validate_recipient("+0123456"));
        assert!(!channel.validate_recipient("1"));
        assert!(!channel.validate_recipient("not-a-number"));
        assert!(!channel.validate_recipient("+1234567890123456"));
    }

    #[test]
    fn test_format_message_skips_empty_body() {
        let channel = SmsChannel::new(configured());

        let with_body = NotificationMessage::new("Alert", "Something happened");
        assert_eq!(
            channel.format_message(&with_body),
            "Alert\n\nSomething happened"
        );

        let title_only = NotificationMessage::new("Alert", "");
        assert_eq!(channel.format_message(&title_only), "Alert");
    }

    #[tokio::test]
    async fn test_send_unconfigured_short_circuits() {
        let channel = SmsChannel::new(SmsConfig::default());
        let message = NotificationMessage::new("Hi", "Test");

        let response = channel.send("+12025550123", &message).await.unwrap();
        assert!(response.is_failure());
        assert_eq!(response.error.as_deref(), Some("SMS channel not configured"));
        assert_eq!(response.channel.as_deref(), Some("sms"));
    }

    #[tokio::test]
    async fn test_send_invalid_recipient_short_circuits() {
        let channel = SmsChannel::new(configured());
        let message = NotificationMessage::new("Hi", "Test");

        let response = channel.send("bogus", &message).await.unwrap();
        assert!(response.is_failure());
        assert_eq!(response.error.as_deref(), Some("Invalid phone number format"));
    }
}
