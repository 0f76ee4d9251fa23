//! Uniform delivery attempt result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of one delivery attempt, uniform across all channels.
///
/// Exactly one of `message_id` / `error` is set, determined by `success`.
/// The constructors are the only way the engine builds responses, so the
/// invariant holds everywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Raw provider reply, opaque to the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_response: Option<Value>,
    /// Name of the adapter that handled (or attempted) the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl NotificationResponse {
    /// Build a successful response.
    pub fn success(
        message_id: impl Into<String>,
        provider_response: Option<Value>,
        channel: impl Into<Option<String>>,
    ) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error: None,
            provider_response,
            channel: channel.into(),
        }
    }

    /// Build a failure response.
    pub fn failure(
        error: impl Into<String>,
        provider_response: Option<Value>,
        channel: impl Into<Option<String>>,
    ) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
            provider_response,
            channel: channel.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn is_failure(&self) -> bool {
        !self.success
    }
}
