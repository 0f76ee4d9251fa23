//! Notio: multi-channel notification dispatch engine.
//!
//! One [`NotificationMessage`] goes in, one provider-backed channel sends
//! it out, and every attempt lands in the delivery log.
//!
//! ## Core Types
//!
//! - [`NotificationMessage`] - Title, body, structured data and attachments
//! - [`NotificationResponse`] - Uniform outcome of a delivery attempt
//! - [`NotificationManager`] - Resolves, dispatches and records
//! - [`ChannelRegistry`] - Named adapters, built-ins plus custom ones
//! - [`ChannelAdapter`] - Trait implemented by every channel
//!
//! ## Channels
//!
//! Email (SMTP via lettre), SMS and voice calls (Twilio), WhatsApp
//! (Twilio), Telegram, Slack, Discord, Microsoft Teams and Facebook
//! Messenger. See [`channels`] for the adapter implementations.
//!
//! ## Recipient detection
//!
//! [`detect::detect_channel`] classifies bare recipients (email address,
//! E.164 phone number, `@username`) so callers can omit the channel for
//! the common shapes.
//!
//! ## Persistence
//!
//! [`database`] holds the SQLite-backed delivery log: pool setup,
//! migrations, the [`DeliveryLogDbModel`] row type and the
//! [`DeliveryLogRepository`] query surface.

pub mod channels;
pub mod config;
pub mod database;
pub mod detect;
pub mod error;
pub mod manager;
pub mod message;
pub mod registry;
pub mod response;
pub mod sink;
pub mod utils;

pub use channels::ChannelAdapter;
pub use config::{ChannelsConfig, LoggingPolicy, NotificationConfig, ReliabilityPolicy};
pub use database::models::{DeliveryLogDbModel, DeliveryStatus};
pub use database::repositories::{DeliveryLogRepository, SqlxDeliveryLogRepository};
pub use database::{DbPool, init_pool, run_migrations};
pub use detect::detect_channel;
pub use error::{Error, Result};
pub use manager::NotificationManager;
pub use message::{Attachment, NotificationMessage};
pub use registry::ChannelRegistry;
pub use response::NotificationResponse;
pub use sink::DeliveryLogSink;
