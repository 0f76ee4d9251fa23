//! Engine configuration.
//!
//! All sections deserialize with serde and fall back to defaults, so a
//! partial config file (or a partially populated environment) yields
//! channels that report `is_configured() == false` instead of an error.

use serde::{Deserialize, Serialize};

use crate::channels::{
    DiscordConfig, EmailConfig, MessengerConfig, SlackConfig, SmsConfig, TeamsConfig,
    TelegramConfig, VoiceConfig, WhatsAppConfig,
};

fn default_channel() -> String {
    "email".to_string()
}

fn default_true() -> bool {
    true
}

/// Per-channel provider credentials and options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub teams: TeamsConfig,
    #[serde(default)]
    pub messenger: MessengerConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
}

/// Controls what the delivery log sink records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingPolicy {
    /// Master switch. When off, no attempt is recorded anywhere.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Persist attempts to the delivery log table.
    #[serde(default = "default_true")]
    pub database: bool,
    /// Emit a tracing event per attempt.
    #[serde(default = "default_true")]
    pub file: bool,
    /// Log full message bodies instead of a 200-character preview.
    #[serde(default)]
    pub detailed_email_logs: bool,
}

impl Default for LoggingPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            database: true,
            file: true,
            detailed_email_logs: false,
        }
    }
}

/// Failure handling policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReliabilityPolicy {
    /// Surface failed deliveries as errors after they have been logged.
    #[serde(default)]
    pub throw_on_failure: bool,
}

/// Top-level configuration for the notification engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Channel used when recipient detection has no match.
    #[serde(default = "default_channel")]
    pub default_channel: String,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub logging: LoggingPolicy,
    #[serde(default)]
    pub reliability: ReliabilityPolicy,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            default_channel: default_channel(),
            channels: ChannelsConfig::default(),
            logging: LoggingPolicy::default(),
            reliability: ReliabilityPolicy::default(),
        }
    }
}

impl NotificationConfig {
    /// Build a configuration from the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(channel) = std::env::var("NOTIO_DEFAULT_CHANNEL") {
            config.default_channel = channel;
        }
        config.reliability.throw_on_failure = env_bool("NOTIO_THROW_ON_FAILURE")
            .unwrap_or(config.reliability.throw_on_failure);
        config.logging.detailed_email_logs = env_bool("NOTIO_DETAILED_EMAIL_LOGS")
            .unwrap_or(config.logging.detailed_email_logs);

        let channels = &mut config.channels;

        channels.email.smtp_host = env_string("SMTP_HOST");
        if let Some(port) = std::env::var("SMTP_PORT").ok().and_then(|v| v.parse().ok()) {
            channels.email.smtp_port = port;
        }
        channels.email.username = env_string("SMTP_USERNAME");
        channels.email.password = env_string("SMTP_PASSWORD");
        channels.email.from_address = env_string("SMTP_FROM_ADDRESS");
        channels.email.use_tls = env_bool("SMTP_USE_TLS").unwrap_or(channels.email.use_tls);

        // The three Twilio-backed channels share one account.
        let twilio_sid = env_string("TWILIO_ACCOUNT_SID");
        let twilio_token = env_string("TWILIO_AUTH_TOKEN");
        channels.sms.account_sid = twilio_sid.clone();
        channels.sms.auth_token = twilio_token.clone();
        channels.sms.from_number = env_string("TWILIO_FROM_NUMBER");
        channels.whatsapp.account_sid = twilio_sid.clone();
        channels.whatsapp.auth_token = twilio_token.clone();
        channels.whatsapp.from_number = env_string("TWILIO_WHATSAPP_FROM");
        channels.voice.account_sid = twilio_sid;
        channels.voice.auth_token = twilio_token;
        channels.voice.from_number = std::env::var("TWILIO_VOICE_FROM_NUMBER")
            .unwrap_or_else(|_| env_string("TWILIO_FROM_NUMBER"));

        channels.telegram.bot_token = env_string("TELEGRAM_BOT_TOKEN");
        channels.slack.bot_token = env_string("SLACK_BOT_TOKEN");
        channels.discord.bot_token = env_string("DISCORD_BOT_TOKEN");
        channels.discord.guild_id = env_string("DISCORD_GUILD_ID");
        channels.teams.webhook_url = env_string("TEAMS_WEBHOOK_URL");
        channels.messenger.page_access_token = env_string("MESSENGER_PAGE_ACCESS_TOKEN");

        config
    }
}

fn env_string(name: &str) -> String {
    std::env::var(name).unwrap_or_default()
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}
