//! Channel adapters.
//!
//! One adapter per delivery provider:
//! - Email (SMTP via lettre)
//! - SMS, Voice and WhatsApp (Twilio REST API)
//! - Telegram Bot API
//! - Slack Web API
//! - Discord Bot API
//! - Microsoft Teams (incoming webhook)
//! - Facebook Messenger (Graph API)
//!
//! Each adapter owns its credentials, captured at construction, and
//! translates the domain message into its provider's wire format. The
//! dispatch engine only ever sees the uniform [`ChannelAdapter`] contract.

mod discord;
mod email;
mod messenger;
mod slack;
mod sms;
mod teams;
mod telegram;
mod voice;
mod whatsapp;

pub use discord::{DiscordChannel, DiscordConfig};
pub use email::{EmailChannel, EmailConfig};
pub use messenger::{MessengerChannel, MessengerConfig};
pub use slack::{SlackChannel, SlackConfig};
pub use sms::{SmsChannel, SmsConfig};
pub use teams::{TeamsChannel, TeamsConfig};
pub use telegram::{TelegramChannel, TelegramConfig};
pub use voice::{VoiceChannel, VoiceConfig};
pub use whatsapp::{WhatsAppChannel, WhatsAppConfig};

use async_trait::async_trait;

use crate::Result;
use crate::message::NotificationMessage;
use crate::response::NotificationResponse;

/// Uniform capability contract implemented by every channel adapter.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Constant identifying name ("email", "sms", ...).
    fn name(&self) -> &'static str;

    /// Whether the captured config carries the credentials this provider
    /// needs. Pure; checked by `send` before any network call.
    fn is_configured(&self) -> bool;

    /// Format-only recipient check. Never contacts the provider.
    fn validate_recipient(&self, recipient: &str) -> bool;

    /// Deliver one message to one recipient.
    ///
    /// Provider rejections, recipient-resolution misses and transport errors
    /// come back as failure responses, not as `Err`; an `Err` escaping here
    /// is a contract violation that the dispatch engine normalizes into a
    /// failure response itself.
    async fn send(
        &self,
        recipient: &str,
        message: &NotificationMessage,
    ) -> Result<NotificationResponse>;
}

/// Capitalize the first character, the way data keys are rendered in
/// channel-formatted "Additional Info" sections.
pub(crate) fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Render a JSON value the way message formatters embed it in plain text:
/// strings bare, everything else as compact JSON.
pub(crate) fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ucfirst() {
        assert_eq!(ucfirst("order_id"), "Order_id");
        assert_eq!(ucfirst(""), "");
        assert_eq!(ucfirst("Already"), "Already");
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&json!("plain")), "plain");
        assert_eq!(value_to_text(&json!(42)), "42");
        assert_eq!(value_to_text(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
