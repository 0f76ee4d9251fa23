//! Crate-wide error types.

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// The requested channel name has no registered adapter.
    #[error("Channel '{0}' not found")]
    ChannelNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A delivery attempt failed and `reliability.throw_on_failure` is set.
    /// The failed attempt has already been logged by the time this is raised.
    #[error("Notification failed: {0}")]
    NotificationFailed(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    DatabaseSqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn channel_not_found(name: impl Into<String>) -> Self {
        Self::ChannelNotFound(name.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
