//! Notification dispatch engine.
//!
//! The manager resolves a recipient to a channel adapter, dispatches the
//! message, records the attempt through the delivery log sink and applies
//! the reliability policy. Adapters report provider failures as failure
//! responses; the only error that escapes `send` before an attempt is
//! recorded is an unknown channel name.

use std::sync::Arc;

use tracing::debug;

use crate::channels::ChannelAdapter;
use crate::config::NotificationConfig;
use crate::database::repositories::DeliveryLogRepository;
use crate::detect::detect_channel;
use crate::message::NotificationMessage;
use crate::registry::ChannelRegistry;
use crate::response::NotificationResponse;
use crate::sink::DeliveryLogSink;
use crate::{Error, Result};

/// Multi-channel notification dispatcher.
pub struct NotificationManager {
    registry: ChannelRegistry,
    sink: DeliveryLogSink,
    default_channel: String,
    throw_on_failure: bool,
}

impl NotificationManager {
    /// Build a manager with all built-in channels.
    ///
    /// Pass a repository to persist delivery logs; `None` limits the sink
    /// to tracing events.
    pub fn new(
        config: &NotificationConfig,
        repository: Option<Arc<dyn DeliveryLogRepository>>,
    ) -> Self {
        Self {
            registry: ChannelRegistry::from_config(&config.channels),
            sink: DeliveryLogSink::new(config.logging.clone(), repository),
            default_channel: config.default_channel.clone(),
            throw_on_failure: config.reliability.throw_on_failure,
        }
    }

    /// Build a manager from pre-assembled parts.
    pub fn with_registry(
        registry: ChannelRegistry,
        sink: DeliveryLogSink,
        default_channel: impl Into<String>,
        throw_on_failure: bool,
    ) -> Self {
        Self {
            registry,
            sink,
            default_channel: default_channel.into(),
            throw_on_failure,
        }
    }

    /// Register an additional adapter, or replace a built-in one.
    pub fn register_channel(
        &mut self,
        name: impl Into<String>,
        adapter: Arc<dyn ChannelAdapter>,
    ) -> &mut Self {
        self.registry.register(name, adapter);
        self
    }

    /// Channel names in registration order.
    pub fn available_channels(&self) -> Vec<&str> {
        self.registry.names()
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Channel used when detection finds no match.
    pub fn default_channel(&self) -> &str {
        &self.default_channel
    }

    /// Channel used for `recipient` when no explicit channel is given.
    pub fn channel_for(&self, recipient: &str) -> String {
        detect_channel(recipient)
            .map(str::to_string)
            .unwrap_or_else(|| self.default_channel.clone())
    }

    /// Dispatch a notification.
    ///
    /// With `channel = None` the channel is detected from the recipient
    /// shape, falling back to the configured default. Provider failures
    /// come back as failure responses after the attempt is recorded;
    /// `Err` is reserved for unknown channel names (nothing recorded) and
    /// for failures under the throw-on-failure policy (recorded first).
    pub async fn send(
        &self,
        recipient: &str,
        message: &NotificationMessage,
        channel: Option<&str>,
    ) -> Result<NotificationResponse> {
        let channel_name = match channel {
            Some(name) => name.to_string(),
            None => self.channel_for(recipient),
        };

        // Unknown channels escape before anything is recorded.
        let adapter = self.registry.get(&channel_name)?;

        debug!(
            recipient = %recipient,
            channel = %channel_name,
            title = %message.title,
            "Dispatching notification"
        );

        let response = match adapter.send(recipient, message).await {
            Ok(response) => response,
            // Contract violation backstop: normalize so the attempt is
            // still recorded.
            Err(e) => NotificationResponse::failure(
                e.to_string(),
                None,
                Some(channel_name.clone()),
            ),
        };

        let resolved = response
            .channel
            .clone()
            .unwrap_or_else(|| channel_name.clone());
        self.sink
            .record(recipient, Some(&resolved), message, &response)
            .await;

        if response.is_failure() && self.throw_on_failure {
            let error = response
                .error
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(Error::NotificationFailed(error));
        }

        Ok(response)
    }

    /// Send one message to several recipients, one result per recipient.
    ///
    /// Recipients are dispatched sequentially and independently; a failed
    /// recipient never stops the remaining ones.
    pub async fn broadcast(
        &self,
        recipients: &[&str],
        message: &NotificationMessage,
        channel: Option<&str>,
    ) -> Vec<Result<NotificationResponse>> {
        let mut results = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            results.push(self.send(recipient, message, channel).await);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StaticChannel {
        name: &'static str,
        response: fn(&'static str) -> Result<NotificationResponse>,
    }

    #[async_trait]
    impl ChannelAdapter for StaticChannel {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_configured(&self) -> bool {
            true
        }

        fn validate_recipient(&self, _recipient: &str) -> bool {
            true
        }

        async fn send(
            &self,
            _recipient: &str,
            _message: &NotificationMessage,
        ) -> Result<NotificationResponse> {
            (self.response)(self.name)
        }
    }

    fn ok_channel(name: &'static str) -> Arc<dyn ChannelAdapter> {
        Arc::new(StaticChannel {
            name,
            response: |name| {
                Ok(NotificationResponse::success(
                    "mock_1",
                    None,
                    Some(name.to_string()),
                ))
            },
        })
    }

    fn err_channel(name: &'static str) -> Arc<dyn ChannelAdapter> {
        Arc::new(StaticChannel {
            name,
            response: |_| Err(Error::Other("transport exploded".to_string())),
        })
    }

    fn manager() -> NotificationManager {
        let mut manager =
            NotificationManager::new(&NotificationConfig::default(), None);
        manager.register_channel("mock", ok_channel("mock"));
        manager
    }

    #[tokio::test]
    async fn test_explicit_channel_routes_to_adapter() {
        let manager = manager();
        let message = NotificationMessage::new("Hi", "Test");

        let response = manager.send("anyone", &message, Some("mock")).await.unwrap();
        assert!(response.is_success());
        assert_eq!(response.channel.as_deref(), Some("mock"));
    }

    #[tokio::test]
    async fn test_detection_routes_email_recipient() {
        let mut manager = manager();
        manager.register_channel("email", ok_channel("email-mock"));
        let message = NotificationMessage::new("Hi", "Test");

        let response = manager
            .send("user@example.com", &message, None)
            .await
            .unwrap();
        assert_eq!(response.channel.as_deref(), Some("email-mock"));
    }

    #[tokio::test]
    async fn test_unknown_channel_is_an_error() {
        let manager = manager();
        let message = NotificationMessage::new("Hi", "Test");

        let err = manager
            .send("anyone", &message, Some("pigeon"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChannelNotFound(_)));
        assert_eq!(err.to_string(), "Channel 'pigeon' not found");
    }

    #[tokio::test]
    async fn test_unconfigured_channel_reports_failure_response() {
        let manager = manager();
        let message = NotificationMessage::new("Hi", "Test");

        let response = manager
            .send("+12025550123", &message, None)
            .await
            .unwrap();
        assert!(response.is_failure());
        assert_eq!(
            response.error.as_deref(),
            Some("SMS channel not configured")
        );
        assert_eq!(response.channel.as_deref(), Some("sms"));
    }

    #[tokio::test]
    async fn test_unrecognized_recipient_uses_default_channel() {
        let mut manager = manager();
        manager.register_channel("email", ok_channel("email-mock"));
        let message = NotificationMessage::new("Hi", "Test");

        // "#ops" matches no shape, and the default channel is email.
        let response = manager.send("#ops", &message, None).await.unwrap();
        assert_eq!(response.channel.as_deref(), Some("email-mock"));
    }

    #[tokio::test]
    async fn test_escaping_adapter_error_is_normalized() {
        let mut manager = manager();
        manager.register_channel("broken", err_channel("broken"));
        let message = NotificationMessage::new("Hi", "Test");

        let response = manager
            .send("anyone", &message, Some("broken"))
            .await
            .unwrap();
        assert!(response.is_failure());
        assert_eq!(response.error.as_deref(), Some("transport exploded"));
        assert_eq!(response.channel.as_deref(), Some("broken"));
    }

    #[tokio::test]
    async fn test_throw_on_failure_surfaces_error() {
        let mut config = NotificationConfig::default();
        config.reliability.throw_on_failure = true;
        let manager = NotificationManager::new(&config, None);
        let message = NotificationMessage::new("Hi", "Test");

        let err = manager
            .send("+12025550123", &message, None)
            .await
            .unwrap_err();
        assert!(
            matches!(&err, Error::NotificationFailed(msg) if msg == "SMS channel not configured")
        );
    }

    #[tokio::test]
    async fn test_broadcast_returns_result_per_recipient() {
        let manager = manager();
        let message = NotificationMessage::new("Hi", "Test");

        let results = manager
            .broadcast(&["a", "b", "c"], &message, Some("mock"))
            .await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.as_ref().unwrap().is_success()));
    }

    #[tokio::test]
    async fn test_broadcast_detects_channel_per_recipient() {
        let manager = manager();
        let message = NotificationMessage::new("Hi", "Test");

        let results = manager
            .broadcast(&["user@example.com", "+12025550123"], &message, None)
            .await;
        assert_eq!(results.len(), 2);
        // email is unconfigured in the default config, sms likewise; both
        // come back as failure responses, not errors.
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn test_available_channels_in_registration_order() {
        let manager = manager();
        let names = manager.available_channels();
        assert_eq!(names.first(), Some(&"email"));
        assert_eq!(names.last(), Some(&"mock"));
    }
}
