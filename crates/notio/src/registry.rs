//! Channel registry.
//!
//! Holds the adapters the engine can dispatch to, keyed by channel name.
//! Built-in channels come from a static constructor table; callers can
//! register additional adapters (or replace built-ins) at runtime.

use std::collections::HashMap;
use std::sync::Arc;

use crate::channels::{
    ChannelAdapter, DiscordChannel, EmailChannel, MessengerChannel, SlackChannel, SmsChannel,
    TeamsChannel, TelegramChannel, VoiceChannel, WhatsAppChannel,
};
use crate::config::ChannelsConfig;
use crate::{Error, Result};

// A type alias for a thread-safe channel constructor function.
type ChannelConstructor = fn(&ChannelsConfig) -> Arc<dyn ChannelAdapter>;

struct ChannelEntry {
    name: &'static str,
    constructor: ChannelConstructor,
}

// Static table of built-in channels. Table order is registration order,
// which `names()` preserves.
static BUILTIN_CHANNELS: &[ChannelEntry] = &[
    ChannelEntry {
        name: "email",
        constructor: |config| Arc::new(EmailChannel::new(config.email.clone())),
    },
    ChannelEntry {
        name: "sms",
        constructor: |config| Arc::new(SmsChannel::new(config.sms.clone())),
    },
    ChannelEntry {
        name: "whatsapp",
        constructor: |config| Arc::new(WhatsAppChannel::new(config.whatsapp.clone())),
    },
    ChannelEntry {
        name: "telegram",
        constructor: |config| Arc::new(TelegramChannel::new(config.telegram.clone())),
    },
    ChannelEntry {
        name: "slack",
        constructor: |config| Arc::new(SlackChannel::new(config.slack.clone())),
    },
    ChannelEntry {
        name: "discord",
        constructor: |config| Arc::new(DiscordChannel::new(config.discord.clone())),
    },
    ChannelEntry {
        name: "teams",
        constructor: |config| Arc::new(TeamsChannel::new(config.teams.clone())),
    },
    ChannelEntry {
        name: "messenger",
        constructor: |config| Arc::new(MessengerChannel::new(config.messenger.clone())),
    },
    ChannelEntry {
        name: "voice",
        constructor: |config| Arc::new(VoiceChannel::new(config.voice.clone())),
    },
];

/// Registry of dispatchable channel adapters.
pub struct ChannelRegistry {
    channels: HashMap<String, Arc<dyn ChannelAdapter>>,
    order: Vec<String>,
}

impl ChannelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Create a registry holding all built-in channels.
    pub fn from_config(config: &ChannelsConfig) -> Self {
        let mut registry = Self::new();
        for entry in BUILTIN_CHANNELS {
            registry.register(entry.name, (entry.constructor)(config));
        }
        registry
    }

    /// Insert an adapter under `name`, replacing any existing one.
    /// A replaced channel keeps its original position in `names()`.
    pub fn register(&mut self, name: impl Into<String>, adapter: Arc<dyn ChannelAdapter>) {
        let name = name.into();
        if !self.channels.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.channels.insert(name, adapter);
    }

    /// Look up a channel by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn ChannelAdapter>> {
        self.channels
            .get(name)
            .cloned()
            .ok_or_else(|| Error::channel_not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Channel names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
