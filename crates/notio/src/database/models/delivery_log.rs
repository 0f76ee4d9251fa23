//! Delivery log database model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::message::NotificationMessage;
use crate::response::NotificationResponse;

/// Delivery attempt status values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Attempt recorded but outcome not yet known.
    Pending,
    /// Provider accepted the notification.
    Sent,
    /// Provider or transport rejected the notification.
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Delivery log database model.
/// One row per notification attempt, successful or not.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DeliveryLogDbModel {
    pub id: String,
    pub recipient: String,
    /// Channel that handled the attempt, when known.
    pub channel: Option<String>,
    pub title: String,
    pub body: Option<String>,
    /// JSON blob of the structured payload entries.
    pub data: Option<String>,
    /// One of the [`DeliveryStatus`] values.
    pub status: String,
    pub message_id: Option<String>,
    pub error: Option<String>,
    /// JSON blob of the raw provider response.
    pub provider_response: Option<String>,
    pub attempts: i64,
    pub sent_at: Option<String>,
    pub failed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl DeliveryLogDbModel {
    /// Build a log row from one delivery attempt.
    pub fn from_attempt(
        recipient: impl Into<String>,
        channel: Option<String>,
        message: &NotificationMessage,
        response: &NotificationResponse,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        let status = if response.is_success() {
            DeliveryStatus::Sent
        } else {
            DeliveryStatus::Failed
        };

        let data = if message.data.is_empty() {
            None
        } else {
            serde_json::to_string(&message.data).ok()
        };
        let provider_response = response
            .provider_response
            .as_ref()
            .and_then(|v| serde_json::to_string(v).ok());

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            recipient: recipient.into(),
            channel,
            title: message.title.clone(),
            body: if message.body.is_empty() {
                None
            } else {
                Some(message.body.clone())
            },
            data,
            status: status.as_str().to_string(),
            message_id: response.message_id.clone(),
            error: response.error.clone(),
            provider_response,
            attempts: 1,
            sent_at: (status == DeliveryStatus::Sent).then(|| now.clone()),
            failed_at: (status == DeliveryStatus::Failed).then(|| now.clone()),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status == DeliveryStatus::Sent.as_str()
    }

    pub fn is_failed(&self) -> bool {
        self.status == DeliveryStatus::Failed.as_str()
    }
}
