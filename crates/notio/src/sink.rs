//! Delivery log sink.
//!
//! Records every dispatch attempt according to the configured
//! [`LoggingPolicy`]. Recording is strictly best-effort: a sink failure is
//! itself logged and never interrupts the dispatch that produced it.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::LoggingPolicy;
use crate::database::models::DeliveryLogDbModel;
use crate::database::repositories::DeliveryLogRepository;
use crate::message::NotificationMessage;
use crate::response::NotificationResponse;

/// Bodies longer than this are truncated in log events. The database row
/// always keeps the full body.
const BODY_PREVIEW_CHARS: usize = 200;

/// Sink that records delivery attempts to tracing and the database.
pub struct DeliveryLogSink {
    policy: LoggingPolicy,
    repository: Option<Arc<dyn DeliveryLogRepository>>,
}

impl DeliveryLogSink {
    pub fn new(
        policy: LoggingPolicy,
        repository: Option<Arc<dyn DeliveryLogRepository>>,
    ) -> Self {
        Self { policy, repository }
    }

    /// Sink that records nothing.
    pub fn disabled() -> Self {
        Self {
            policy: LoggingPolicy {
                enabled: false,
                ..LoggingPolicy::default()
            },
            repository: None,
        }
    }

    /// Record one delivery attempt.
    pub async fn record(
        &self,
        recipient: &str,
        channel: Option<&str>,
        message: &NotificationMessage,
        response: &NotificationResponse,
    ) {
        if !self.policy.enabled {
            return;
        }

        if self.policy.file {
            let body = if self.policy.detailed_email_logs {
                message.body.clone()
            } else {
                body_preview(&message.body)
            };
            let status = if response.is_success() { "sent" } else { "failed" };
            info!(
                recipient = %recipient,
                channel = channel.unwrap_or("unknown"),
                status = status,
                message_id = ?response.message_id,
                error = ?response.error,
                title = %message.title,
                body = %body,
                "Notification processed"
            );
        }

        if self.policy.database {
            if let Some(repository) = &self.repository {
                let log = DeliveryLogDbModel::from_attempt(
                    recipient,
                    channel.map(str::to_string),
                    message,
                    response,
                );
                if let Err(e) = repository.insert(&log).await {
                    error!(
                        recipient = %recipient,
                        error = %e,
                        "Failed to persist delivery log"
                    );
                }
            }
        }
    }
}

/// First [`BODY_PREVIEW_CHARS`] characters of `body`, with an ellipsis
/// marker when truncated.
fn body_preview(body: &str) -> String {
    if body.chars().count() <= BODY_PREVIEW_CHARS {
        return body.to_string();
    }
    let mut preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
    preview.push_str("...");
    preview
}
