//! Discord channel (REST API v10, embed messages).

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{ChannelAdapter, ucfirst, value_to_text};
use crate::message::NotificationMessage;
use crate::response::NotificationResponse;
use crate::{Error, Result};

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Numeric user id, with an optional `@` prefix.
static USER_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^@?[0-9]+$").unwrap());

/// Conversation-style id that is passed through untouched.
static CHANNEL_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[CG][A-Z0-9]+$").unwrap());

fn default_color() -> String {
    "00ff00".to_string()
}

/// Discord channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token used for the `Authorization: Bot ...` header.
    #[serde(default)]
    pub bot_token: String,
    /// Guild searched when resolving `#channel-name` recipients.
    #[serde(default)]
    pub guild_id: String,
    /// Embed accent color as a hex string.
    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            guild_id: String::new(),
            color: default_color(),
        }
    }
}

/// Discord notification channel.
pub struct DiscordChannel {
    config: DiscordConfig,
    client: Client,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Self {
        crate::utils::http_client::install_rustls_provider();
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Build the embed payload.
    fn build_embed(&self, message: &NotificationMessage) -> Value {
        let fields: Vec<Value> = message
            .data
            .iter()
            .map(|(key, value)| {
                json!({
                    "name": ucfirst(&key.replace('_', " ")),
                    "value": value_to_text(value),
                    "inline": true,
                })
            })
            .collect();

        json!({
            "title": message.title,
            "description": message.body,
            "color": u32::from_str_radix(&self.config.color, 16).unwrap_or(0x00ff00),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "fields": fields,
        })
    }

    /// Resolve the recipient to a channel id. Numeric ids open a DM,
    /// `#names` are looked up in the configured guild.
    async fn resolve_channel_id(&self, recipient: &str) -> Result<String> {
        if USER_ID_RE.is_match(recipient) {
            let user_id = recipient.trim_start_matches('@');

            let response = self
                .client
                .post(format!("{}/users/@me/channels", DISCORD_API_BASE))
                .header("Authorization", format!("Bot {}", self.config.bot_token))
                .json(&json!({ "recipient_id": user_id }))
                .send()
                .await
                .map_err(|e| Error::Other(format!("Discord request failed: {}", e)))?;
            let json: Value = response.json().await.unwrap_or_default();

            return match json.get("id").and_then(Value::as_str) {
                Some(id) => Ok(id.to_string()),
                None => Err(Error::Other(format!(
                    "Unable to open DM channel: {}",
                    json
                ))),
            };
        }

        if CHANNEL_ID_RE.is_match(recipient) {
            return Ok(recipient.to_string());
        }

        let name = recipient.trim_start_matches('#');
        let response = self
            .client
            .get(format!(
                "{}/guilds/{}/channels",
                DISCORD_API_BASE, self.config.guild_id
            ))
            .header("Authorization", format!("Bot {}", self.config.bot_token))
            .send()
            .await
            .map_err(|e| Error::Other(format!("Discord request failed: {}", e)))?;
        let json: Value = response.json().await.unwrap_or_default();

        let channels = json.as_array().ok_or_else(|| {
            Error::Other(format!("Unable to fetch guild channels: {}", json))
        })?;

        for channel in channels {
            if channel
                .get("name")
                .and_then(Value::as_str)
                .is_some_and(|n| n == name)
            {
                if let Some(id) = channel.get("id").and_then(Value::as_str) {
                    return Ok(id.to_string());
                }
            }
        }

        Err(Error::Other(format!(
            "Channel '{}' not found in guild {}",
            name, self.config.guild_id
        )))
    }

    async fn deliver(
        &self,
        recipient: &str,
        message: &NotificationMessage,
    ) -> Result<NotificationResponse> {
        let channel_id = self.resolve_channel_id(recipient).await?;

        let response = self
            .client
            .post(format!(
                "{}/channels/{}/messages",
                DISCORD_API_BASE, channel_id
            ))
            .header("Authorization", format!("Bot {}", self.config.bot_token))
            .json(&json!({ "embeds": [self.build_embed(message)] }))
            .send()
            .await
            .map_err(|e| Error::Other(format!("Discord request failed: {}", e)))?;

        let status = response.status();
        let json: Value = response.json().await.unwrap_or_default();

        if status.is_success() {
            let message_id = json
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("discord_{}", chrono::Utc::now().timestamp()));
            debug!(recipient = %recipient, message_id = %message_id, "Discord message sent");
            return Ok(NotificationResponse::success(
                message_id,
                Some(json),
                Some("discord".to_string()),
            ));
        }

        let error = json
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Discord API error")
            .to_string();
        warn!(recipient = %recipient, status = %status, error = %error, "Discord send failed");
        Ok(NotificationResponse::failure(
            error,
            Some(json),
            Some("discord".to_string()),
        ))
    }
}

#[async_trait]
impl ChannelAdapter for DiscordChannel {
    fn name(&self) -> &'static str {
        "discord"
    }

    fn is_configured(&self) -> bool {
        !self.config.bot_token.is_empty() && !self.config.guild_id.is_empty()
    }

    fn validate_recipient(&self, _recipient: &str) -> bool {
        true
    }

    async fn send(
        &self,
        recipient: &str,
        message: &NotificationMessage,
    ) -> Result<NotificationResponse> {
        if !self.is_configured() {
            return Ok(NotificationResponse::failure(
                "Discord not configured (missing bot token or guild id)",
                None,
                Some("discord".to_string()),
            ));
        }

        match self.deliver(recipient, message).await {
            Ok(response) => Ok(response),
            Err(e) => Ok(NotificationResponse::failure(
                e.to_string(),
                None,
                Some("discord".to_string()),
            )),
        }
    }
}
