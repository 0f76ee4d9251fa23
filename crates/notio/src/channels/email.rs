//! Email channel (SMTP via lettre).

use std::sync::LazyLock;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as EmailAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use md5::{Digest, Md5};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::ChannelAdapter;
use crate::message::NotificationMessage;
use crate::response::NotificationResponse;
use crate::{Error, Result};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Email channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP server hostname.
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Sender address for all outgoing mail.
    #[serde(default)]
    pub from_address: String,
    /// Use a TLS relay instead of a plaintext connection.
    #[serde(default)]
    pub use_tls: bool,
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from_address: String::new(),
            use_tls: false,
        }
    }
}

/// Email notification channel.
pub struct EmailChannel {
    config: EmailConfig,
}

impl EmailChannel {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Build the SMTP transport. Constructed per send; the transport itself
    /// pools connections only for the lifetime of one delivery here.
    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let mut builder = if self.config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
                .map_err(|e| Error::Other(format!("SMTP transport error: {}", e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.smtp_host)
        };

        builder = builder.port(self.config.smtp_port);

        if !self.config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ));
        }

        Ok(builder.build())
    }

    /// Assemble the MIME message. Missing attachment files are skipped with
    /// a warning rather than failing the whole delivery.
    async fn build_mail(&self, recipient: &str, message: &NotificationMessage) -> Result<Message> {
        let from: Mailbox = self
            .config
            .from_address
            .parse()
            .map_err(|e| Error::config(format!("Invalid from address: {}", e)))?;
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| Error::validation(format!("Invalid email recipient: {}", e)))?;

        let builder = Message::builder()
            .from(from)
            .to(to)
            .subject(message.title.as_str());

        let mut body = MultiPart::mixed().singlepart(SinglePart::plain(message.body.clone()));

        for attachment in &message.attachments {
            if !attachment.path.exists() {
                warn!(path = %attachment.path.display(), "Attachment file not found");
                continue;
            }

            let content = tokio::fs::read(&attachment.path).await?;
            let filename = attachment
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment".to_string());
            let mime = attachment
                .options
                .get("mime")
                .and_then(|v| v.as_str())
                .unwrap_or("application/octet-stream");
            let content_type = ContentType::parse(mime)
                .map_err(|e| Error::Other(format!("Invalid attachment content type: {}", e)))?;

            body = body.singlepart(EmailAttachment::new(filename).body(content, content_type));
        }

        builder
            .multipart(body)
            .map_err(|e| Error::Other(format!("Failed to build email: {}", e)))
    }

    async fn deliver(&self, recipient: &str, message: &NotificationMessage) -> Result<()> {
        let email = self.build_mail(recipient, message).await?;

        self.transport()?
            .send(email)
            .await
            .map_err(|e| Error::Other(format!("SMTP send failed: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    fn is_configured(&self) -> bool {
        !self.config.smtp_host.is_empty() && !self.config.from_address.is_empty()
    }

    fn validate_recipient(&self, recipient: &str) -> bool {
        EMAIL_RE.is_match(recipient)
    }

    async fn send(
        &self,
        recipient: &str,
        message: &NotificationMessage,
    ) -> Result<NotificationResponse> {
        if !self.is_configured() {
            return Ok(NotificationResponse::failure(
                "Email channel not configured",
                None,
                Some("email".to_string()),
            ));
        }

        if !self.validate_recipient(recipient) {
            return Ok(NotificationResponse::failure(
                "Invalid email address",
                None,
                Some("email".to_string()),
            ));
        }

        match self.deliver(recipient, message).await {
            Ok(()) => {
                // SMTP has no provider-side id; synthesize a stable-ish one.
                let message_id = format!(
                    "email_{}_{}",
                    chrono::Utc::now().timestamp(),
                    &hex::encode(Md5::digest(recipient.as_bytes()))[..8]
                );

                debug!(recipient = %recipient, message_id = %message_id, "Email sent");

                Ok(NotificationResponse::success(
                    message_id,
                    Some(json!({ "recipient": recipient })),
                    Some("email".to_string()),
                ))
            }
            Err(e) => Ok(NotificationResponse::failure(
                e.to_string(),
                None,
                Some("email".to_string()),
            )),
        }
    }
}
