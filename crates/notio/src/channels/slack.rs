//! Slack channel (Web API `chat.postMessage`).
//!
//! Recipients may be a raw conversation id, a `#channel-name` or a
//! `@username`. Names are resolved against the workspace through the
//! paginated `conversations.list` / `users.list` endpoints before posting.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{ChannelAdapter, value_to_text};
use crate::message::NotificationMessage;
use crate::response::NotificationResponse;
use crate::{Error, Result};

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Slack channel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot user OAuth token (`xoxb-...`).
    #[serde(default)]
    pub bot_token: String,
}

/// Slack notification channel.
pub struct SlackChannel {
    config: SlackConfig,
    client: Client,
}

impl SlackChannel {
    pub fn new(config: SlackConfig) -> Self {
        crate::utils::http_client::install_rustls_provider();
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Build the mrkdwn message text.
    fn format_message(&self, message: &NotificationMessage) -> String {
        let mut lines = Vec::new();

        if !message.title.is_empty() {
            lines.push(format!("*{}*", message.title));
        }
        if !message.body.is_empty() {
            lines.push(message.body.clone());
        }
        for (key, value) in &message.data {
            lines.push(format!("\u{2022} *{}*: {}", key, value_to_text(value)));
        }

        lines.join("\n")
    }

    /// Resolve `#channel-name` / `@username` recipients to a conversation id.
    /// Raw ids pass through untouched.
    async fn resolve_conversation_id(&self, recipient: &str) -> Result<String> {
        if let Some(name) = recipient.strip_prefix('#') {
            return self.find_channel_id_by_name(name).await;
        }

        if let Some(username) = recipient.strip_prefix('@') {
            let user_id = self.find_user_id_by_username(username).await?;

            // A DM requires an opened conversation with the user.
            let response = self
                .client
                .post(format!("{}/conversations.open", SLACK_API_BASE))
                .bearer_auth(&self.config.bot_token)
                .json(&json!({ "users": user_id }))
                .send()
                .await
                .map_err(|e| Error::Other(format!("Slack request failed: {}", e)))?;
            let json: Value = response.json().await.unwrap_or_default();

            if json.get("ok").and_then(Value::as_bool).unwrap_or(false) {
                if let Some(id) = json.pointer("/channel/id").and_then(Value::as_str) {
                    return Ok(id.to_string());
                }
            }
            let error = json
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(Error::Other(format!(
                "Unable to open conversation with @{}: {}",
                username, error
            )));
        }

        Ok(recipient.to_string())
    }

    async fn find_channel_id_by_name(&self, name: &str) -> Result<String> {
        let mut cursor = String::new();

        loop {
            let mut request = self
                .client
                .get(format!("{}/conversations.list", SLACK_API_BASE))
                .bearer_auth(&self.config.bot_token)
                .query(&[
                    ("limit", "1000"),
                    ("types", "public_channel,private_channel"),
                ]);
            if !cursor.is_empty() {
                request = request.query(&[("cursor", cursor.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Error::Other(format!("Slack request failed: {}", e)))?;
            let json: Value = response.json().await.unwrap_or_default();

            if !json.get("ok").and_then(Value::as_bool).unwrap_or(false) {
                break;
            }

            if let Some(channels) = json.get("channels").and_then(Value::as_array) {
                for channel in channels {
                    let matches = channel
                        .get("name")
                        .and_then(Value::as_str)
                        .is_some_and(|n| n == name)
                        || channel
                            .get("name_normalized")
                            .and_then(Value::as_str)
                            .is_some_and(|n| n == name);
                    if matches {
                        if let Some(id) = channel.get("id").and_then(Value::as_str) {
                            return Ok(id.to_string());
                        }
                    }
                }
            }

            match json
                .pointer("/response_metadata/next_cursor")
                .and_then(Value::as_str)
            {
                Some(next) if !next.is_empty() => cursor = next.to_string(),
                _ => break,
            }
        }

        Err(Error::Other(format!(
            "Channel #{} not found or bot not member",
            name
        )))
    }

    async fn find_user_id_by_username(&self, username: &str) -> Result<String> {
        let mut cursor = String::new();

        loop {
            let mut request = self
                .client
                .get(format!("{}/users.list", SLACK_API_BASE))
                .bearer_auth(&self.config.bot_token)
                .query(&[("limit", "200")]);
            if !cursor.is_empty() {
                request = request.query(&[("cursor", cursor.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Error::Other(format!("Slack request failed: {}", e)))?;
            let json: Value = response.json().await.unwrap_or_default();

            if !json.get("ok").and_then(Value::as_bool).unwrap_or(false) {
                break;
            }

            if let Some(members) = json.get("members").and_then(Value::as_array) {
                for member in members {
                    let matches = member
                        .get("name")
                        .and_then(Value::as_str)
                        .is_some_and(|n| n == username)
                        || member
                            .pointer("/profile/display_name")
                            .and_then(Value::as_str)
                            .is_some_and(|n| n == username);
                    if matches {
                        if let Some(id) = member.get("id").and_then(Value::as_str) {
                            return Ok(id.to_string());
                        }
                    }
                }
            }

            match json
                .pointer("/response_metadata/next_cursor")
                .and_then(Value::as_str)
            {
                Some(next) if !next.is_empty() => cursor = next.to_string(),
                _ => break,
            }
        }

        Err(Error::Other(format!("User @{} not found", username)))
    }

    async fn deliver(
        &self,
        recipient: &str,
        message: &NotificationMessage,
    ) -> Result<NotificationResponse> {
        let conversation_id = self.resolve_conversation_id(recipient).await?;

        let response = self
            .client
            .post(format!("{}/chat.postMessage", SLACK_API_BASE))
            .bearer_auth(&self.config.bot_token)
            .json(&json!({
                "channel": conversation_id,
                "text": self.format_message(message),
            }))
            .send()
            .await
            .map_err(|e| Error::Other(format!("Slack request failed: {}", e)))?;

        let status = response.status();
        let json: Value = response.json().await.unwrap_or_default();

        if status.is_success() && json.get("ok").and_then(Value::as_bool).unwrap_or(false) {
            let message_id = json
                .get("ts")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| chrono::Utc::now().timestamp().to_string());
            debug!(recipient = %recipient, ts = %message_id, "Slack message sent");
            return Ok(NotificationResponse::success(
                message_id,
                Some(json),
                Some("slack".to_string()),
            ));
        }

        let error = json
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("Unknown Slack API error")
            .to_string();
        warn!(recipient = %recipient, error = %error, "Slack send failed");
        Ok(NotificationResponse::failure(
            error,
            Some(json),
            Some("slack".to_string()),
        ))
    }
}

#[async_trait]
impl ChannelAdapter for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn is_configured(&self) -> bool {
        !self.config.bot_token.is_empty()
    }

    fn validate_recipient(&self, recipient: &str) -> bool {
        !recipient.is_empty()
    }

    async fn send(
        &self,
        recipient: &str,
        message: &NotificationMessage,
    ) -> Result<NotificationResponse> {
        if !self.is_configured() {
            return Ok(NotificationResponse::failure(
                "Slack channel not configured",
                None,
                Some("slack".to_string()),
            ));
        }

        match self.deliver(recipient, message).await {
            Ok(response) => Ok(response),
            Err(e) => Ok(NotificationResponse::failure(
                e.to_string(),
                None,
                Some("slack".to_string()),
            )),
        }
    }
}
