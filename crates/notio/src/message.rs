//! Notification message value object.
//!
//! A message is built once by the caller and never mutated by the engine.
//! The `with_*` builders consume the value and return an extended copy, so a
//! message can be shared across `send` calls without aliasing surprises.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A file attached to a notification.
///
/// Only the email channel delivers attachments; other channels ignore them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Path to the file on the local filesystem.
    pub path: PathBuf,
    /// Channel-specific attachment options (e.g. `mime`, `as` filename).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

impl Attachment {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: Map::new(),
        }
    }
}

/// One logical notification, independent of the channel that delivers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,
    /// Structured key/value payload rendered by each channel in its own way
    /// (Telegram bullet list, Discord embed fields, Teams facts, ...).
    /// Insertion order is preserved.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Channel-specific hints, opaque to the engine.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

impl NotificationMessage {
    /// Create a message with a title and body and nothing else.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: Map::new(),
            attachments: Vec::new(),
            options: Map::new(),
        }
    }

    /// Return a copy with `data` merged in. Keys given here win over
    /// existing ones.
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data.extend(data);
        self
    }

    /// Return a copy with one data entry set.
    pub fn with_data_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Return a copy with `attachments` appended.
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments.extend(attachments);
        self
    }

    /// Return a copy with `options` merged in.
    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options.extend(options);
        self
    }
}
