//! Voice call channel (Twilio Calls API with inline TwiML).

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

/// Voice channel configuration (Twilio credentials plus speech settings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub from_number: String,
    /// Text-to-speech voice.
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_voice() -> String {
    "alice".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            voice: default_voice(),
            language: default_language(),
        }
    }
}

/// Voice call notification channel. The message is read out via TwiML.
pub struct VoiceChannel {
    config: VoiceConfig,
    client: Client,
}

impl VoiceChannel {
    pub fn new(config: VoiceConfig) -> Self {
        crate::utils::http_client::install_rustls_provider();
        Self {
            config,
            client: Client::new(),
        }
    }

    fn generate_twiml(&self, message: &NotificationMessage) -> String {
        let mut text = message.title.clone();
        if !message.body.is_empty() {
            text.push_str(". ");
            text.push_str(&message.body);
        }

        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Say voice=\"{}\" language=\"{}\">{}</Say></Response>",
            self.config.voice,
            self.config.language,
            xml_escape(&text)
        )
    }

    async fn deliver(
        &self,
        recipient: &str,
        message: &NotificationMessage,
    ) -> Result<NotificationResponse> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Calls.json",
            self.config.account_sid
        );
        let twiml = self.generate_twiml(message);
        let params = [
            ("To", recipient),
            ("From", self.config.from_number.as_str()),
            ("Twiml", twiml.as_str()),
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
            debug!(recipient = %recipient, sid = %sid, "Voice call placed");
            return Ok(NotificationResponse::success(
                sid,
                Some(json),
                Some("voice".to_string()),
            ));
        }

        let error = json
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown Twilio API error")
            .to_string();
        warn!(recipient = %recipient, status = %status, error = %error, "Voice call failed");
        Ok(NotificationResponse::failure(
            error,
            Some(json),
            Some("voice".to_string()),
        ))
    }
}

#[async_trait]
impl ChannelAdapter for VoiceChannel {
    fn name(&self) -> &'static str {
        "voice"
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
                "Voice channel not configured",
                None,
                Some("voice".to_string()),
            ));
        }

        if !self.validate_recipient(recipient) {
            return Ok(NotificationResponse::failure(
                "Invalid phone number format",
                None,
                Some("voice".to_string()),
            ));
        }

        match self.deliver(recipient, message).await {
            Ok(response) => Ok(response),
            Err(e) => Ok(NotificationResponse::failure(
                e.to_string(),
                None,
                Some("voice".to_string()),
            )),
        }
    }
}

/// Escape the five XML-reserved characters for embedding in TwiML.
fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> VoiceConfig {
        VoiceConfig {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from_number: "+15005550006".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_voice_config_defaults() {
        let config = VoiceConfig::default();
        assert_eq!(config.voice, "alice");
        assert_eq!(config.language, "en-US");
    }

    #[test]
    fn test_generate_twiml() {
        let channel = VoiceChannel::new(configured());
        let message = NotificationMessage::new("Alert", "Disk <90%> full & rising");

        let twiml = channel.generate_twiml(&message);
        assert!(twiml.starts_with("<?xml"));
        assert!(twiml.contains("<Say voice=\"alice\" language=\"en-US\">"));
        assert!(twiml.contains("Alert. Disk &lt;90%&gt; full &amp; rising"));
    }

    #[test]
    fn test_generate_twiml_title_only() {
        let channel = VoiceChannel::new(configured());
        let message = NotificationMessage::new("Alert", "");

        let twiml = channel.generate_twiml(&message);
        assert!(twiml.contains(">Alert</Say>"));
    }

    #[tokio::test]
    async fn test_send_unconfigured_short_circuits() {
        let channel = VoiceChannel::new(VoiceConfig::default());
        let message = NotificationMessage::new("Hi", "Test");

        let response = channel.send("+12025550123", &message).await.unwrap();
        assert!(response.is_failure());
        assert_eq!(
            response.error.as_deref(),
            Some("Voice channel not configured")
        );
    }
}
