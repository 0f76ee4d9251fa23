//! Microsoft Teams channel (incoming webhook, MessageCard payload).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{ChannelAdapter, ucfirst, value_to_text};
use crate::message::NotificationMessage;
use crate::response::NotificationResponse;
use crate::{Error, Result};

fn default_theme_color() -> String {
    "0076D7".to_string()
}

/// Teams channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamsConfig {
    /// Incoming webhook URL of the target team channel.
    #[serde(default)]
    pub webhook_url: String,
    /// Card accent color as a hex string.
    #[serde(default = "default_theme_color")]
    pub theme_color: String,
}

impl Default for TeamsConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            theme_color: default_theme_color(),
        }
    }
}

/// Microsoft Teams notification channel.
pub struct TeamsChannel {
    config: TeamsConfig,
    client: Client,
}

impl TeamsChannel {
    pub fn new(config: TeamsConfig) -> Self {
        crate::utils::http_client::install_rustls_provider();
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Build the MessageCard payload.
    fn build_card(&self, message: &NotificationMessage) -> Value {
        let facts: Vec<Value> = message
            .data
            .iter()
            .map(|(key, value)| {
                json!({
                    "name": ucfirst(key),
                    "value": value_to_text(value),
                })
            })
            .collect();

        json!({
            "@type": "MessageCard",
            "@context": "http://schema.org/extensions",
            "themeColor": self.config.theme_color,
            "summary": message.title,
            "sections": [{
                "activityTitle": message.title,
                "activitySubtitle": chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                "text": message.body,
                "facts": facts,
            }],
        })
    }

    async fn deliver(&self, message: &NotificationMessage) -> Result<NotificationResponse> {
        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(&self.build_card(message))
            .send()
            .await
            .map_err(|e| Error::Other(format!("Teams request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            let message_id = format!("teams_{}", chrono::Utc::now().timestamp());
            debug!(message_id = %message_id, "Teams card posted");
            return Ok(NotificationResponse::success(
                message_id,
                Some(json!({ "status_code": status.as_u16() })),
                Some("teams".to_string()),
            ));
        }

        let json: Value = response.json().await.unwrap_or_default();
        warn!(status = %status, "Teams webhook failed");
        Ok(NotificationResponse::failure(
            format!("Teams webhook failed: {}", status.as_u16()),
            Some(json),
            Some("teams".to_string()),
        ))
    }
}

#[async_trait]
impl ChannelAdapter for TeamsChannel {
    fn name(&self) -> &'static str {
        "teams"
    }

    fn is_configured(&self) -> bool {
        !self.config.webhook_url.is_empty()
    }

    fn validate_recipient(&self, _recipient: &str) -> bool {
        true
    }

    async fn send(
        &self,
        _recipient: &str,
        message: &NotificationMessage,
    ) -> Result<NotificationResponse> {
        if !self.is_configured() {
            return Ok(NotificationResponse::failure(
                "Teams channel not configured",
                None,
                Some("teams".to_string()),
            ));
        }

        match self.deliver(message).await {
            Ok(response) => Ok(response),
            Err(e) => Ok(NotificationResponse::failure(
                e.to_string(),
                None,
                Some("teams".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = TeamsConfig::default();
        assert_eq!(config.theme_color, "0076D7");
        assert!(config.webhook_url.is_empty());
    }

    #[test]
    fn test_build_card() {
        let channel = TeamsChannel::new(TeamsConfig {
            webhook_url: "https://example.webhook.office.com/x".to_string(),
            theme_color: default_theme_color(),
        });
        let message = NotificationMessage::new("Outage", "Database is down")
            .with_data_entry("severity", "critical");

        let card = channel.build_card(&message);
        assert_eq!(card["@type"], "MessageCard");
        assert_eq!(card["themeColor"], "0076D7");
        assert_eq!(card["summary"], "Outage");
        assert_eq!(card["sections"][0]["activityTitle"], "Outage");
        assert_eq!(card["sections"][0]["text"], "Database is down");
        assert_eq!(card["sections"][0]["facts"][0]["name"], "Severity");
        assert_eq!(card["sections"][0]["facts"][0]["value"], "critical");
    }

    #[tokio::test]
    async fn test_send_unconfigured_short_circuits() {
        let channel = TeamsChannel::new(TeamsConfig::default());
        let message = NotificationMessage::new("Hi", "Test");

        let response = channel.send("ops", &message).await.unwrap();
        assert!(response.is_failure());
        assert_eq!(
            response.error.as_deref(),
            Some("Teams channel not configured")
        );
    }
}
