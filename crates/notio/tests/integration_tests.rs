//! Integration tests for the notio engine.
//!
//! These tests use a real SQLite database (in-memory) to verify that
//! dispatching, the delivery log sink and the repository queries work
//! against the actual schema.

use std::sync::Arc;

use async_trait::async_trait;
use notio_engine::database::{DbPool, init_pool, run_migrations};
use notio_engine::{
    ChannelAdapter, DeliveryLogDbModel, DeliveryLogRepository, DeliveryStatus, Error,
    NotificationConfig, NotificationManager, NotificationMessage, NotificationResponse, Result,
    SqlxDeliveryLogRepository,
};

/// Helper to create a test database pool with migrations applied.
async fn setup_test_db() -> DbPool {
    let pool = init_pool("sqlite::memory:")
        .await
        .expect("Failed to create test pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// Adapter that always succeeds, for driving the engine without a provider.
struct AlwaysOkChannel {
    name: &'static str,
}

#[async_trait]
impl ChannelAdapter for AlwaysOkChannel {
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
        Ok(NotificationResponse::success(
            "mock_123",
            Some(serde_json::json!({"accepted": true})),
            Some(self.name.to_string()),
        ))
    }
}

async fn count_rows(pool: &DbPool) -> i64 {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM delivery_logs")
        .fetch_one(pool)
        .await
        .expect("Failed to count rows");
    count.0
}

mod database_tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_create_delivery_logs() {
        let pool = setup_test_db().await;

        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .expect("Failed to query tables");

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert!(
            table_names.contains(&"delivery_logs"),
            "delivery_logs table missing"
        );

        let indexes: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'")
                .fetch_all(&pool)
                .await
                .expect("Failed to query indexes");
        assert!(indexes.len() >= 7, "expected the delivery log indexes");
    }

    #[tokio::test]
    async fn test_status_check_constraint() {
        let pool = setup_test_db().await;

        let result = sqlx::query(
            "INSERT INTO delivery_logs (id, recipient, title, status, created_at, updated_at)
             VALUES ('x', 'r', 't', 'bogus', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err(), "CHECK constraint should reject bad status");
    }
}

mod repository_tests {
    use super::*;

    fn sample_log(recipient: &str, channel: &str, success: bool) -> DeliveryLogDbModel {
        let message = NotificationMessage::new("Test title", "Test body")
            .with_data_entry("k", "v");
        let response = if success {
            NotificationResponse::success("m1", None, Some(channel.to_string()))
        } else {
            NotificationResponse::failure("nope", None, Some(channel.to_string()))
        };
        DeliveryLogDbModel::from_attempt(
            recipient,
            Some(channel.to_string()),
            &message,
            &response,
        )
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let pool = setup_test_db().await;
        let repository = SqlxDeliveryLogRepository::new(pool);

        let log = sample_log("user@example.com", "email", true);
        repository.insert(&log).await.expect("insert failed");

        let fetched = repository.get(&log.id).await.expect("get failed");
        assert_eq!(fetched.id, log.id);
        assert_eq!(fetched.recipient, "user@example.com");
        assert_eq!(fetched.channel.as_deref(), Some("email"));
        assert_eq!(fetched.title, "Test title");
        assert_eq!(fetched.body.as_deref(), Some("Test body"));
        assert_eq!(fetched.data.as_deref(), Some(r#"{"k":"v"}"#));
        assert_eq!(fetched.status, "sent");
        assert_eq!(fetched.attempts, 1);
        assert!(fetched.sent_at.is_some());
    }

    #[tokio::test]
    async fn test_get_missing_row() {
        let pool = setup_test_db().await;
        let repository = SqlxDeliveryLogRepository::new(pool);

        let err = repository.get("nope").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_list_recent_orders_newest_first() {
        let pool = setup_test_db().await;
        let repository = SqlxDeliveryLogRepository::new(pool);

        let mut first = sample_log("a@example.com", "email", true);
        first.created_at = "2026-01-01T00:00:00Z".to_string();
        let mut second = sample_log("b@example.com", "email", true);
        second.created_at = "2026-01-02T00:00:00Z".to_string();

        repository.insert(&first).await.unwrap();
        repository.insert(&second).await.unwrap();

        let logs = repository.list_recent(10).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].recipient, "b@example.com");
        assert_eq!(logs[1].recipient, "a@example.com");

        let limited = repository.list_recent(1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].recipient, "b@example.com");
    }

    #[tokio::test]
    async fn test_status_and_channel_filters() {
        let pool = setup_test_db().await;
        let repository = SqlxDeliveryLogRepository::new(pool);

        repository
            .insert(&sample_log("a@example.com", "email", true))
            .await
            .unwrap();
        repository
            .insert(&sample_log("+12025550123", "sms", false))
            .await
            .unwrap();
        repository
            .insert(&sample_log("#ops", "slack", false))
            .await
            .unwrap();

        let failed = repository
            .list_by_status(DeliveryStatus::Failed, 10)
            .await
            .unwrap();
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|l| l.is_failed()));

        let slack = repository.list_for_channel("slack", None, 10).await.unwrap();
        assert_eq!(slack.len(), 1);
        assert_eq!(slack[0].recipient, "#ops");

        let slack_failed = repository
            .list_for_channel("slack", Some(DeliveryStatus::Failed), 10)
            .await
            .unwrap();
        assert_eq!(slack_failed.len(), 1);
        let slack_sent = repository
            .list_for_channel("slack", Some(DeliveryStatus::Sent), 10)
            .await
            .unwrap();
        assert!(slack_sent.is_empty());

        let for_recipient = repository
            .list_for_recipient("a@example.com", 10)
            .await
            .unwrap();
        assert_eq!(for_recipient.len(), 1);
        assert!(for_recipient[0].is_successful());

        assert_eq!(
            repository.count_by_status(DeliveryStatus::Sent).await.unwrap(),
            1
        );
        assert_eq!(
            repository
                .count_by_status(DeliveryStatus::Failed)
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            repository
                .count_by_status(DeliveryStatus::Pending)
                .await
                .unwrap(),
            0
        );
    }
}

mod dispatch_tests {
    use super::*;

    fn manager_with(
        pool: &DbPool,
        configure: impl FnOnce(&mut NotificationConfig),
    ) -> NotificationManager {
        let mut config = NotificationConfig::default();
        configure(&mut config);
        let repository = Arc::new(SqlxDeliveryLogRepository::new(pool.clone()));
        let mut manager = NotificationManager::new(&config, Some(repository));
        manager.register_channel("mock", Arc::new(AlwaysOkChannel { name: "mock" }));
        manager
    }

    #[tokio::test]
    async fn test_successful_dispatch_is_recorded() {
        let pool = setup_test_db().await;
        let manager = manager_with(&pool, |_| {});
        let message = NotificationMessage::new("Welcome", "Glad you are here")
            .with_data_entry("plan", "pro");

        let response = manager
            .send("anyone", &message, Some("mock"))
            .await
            .expect("send failed");
        assert!(response.is_success());
        assert_eq!(response.message_id.as_deref(), Some("mock_123"));

        let repository = SqlxDeliveryLogRepository::new(pool.clone());
        let logs = repository.list_recent(10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, "sent");
        assert_eq!(logs[0].channel.as_deref(), Some("mock"));
        assert_eq!(logs[0].message_id.as_deref(), Some("mock_123"));
        assert_eq!(logs[0].title, "Welcome");
        assert!(logs[0].provider_response.as_deref().unwrap().contains("accepted"));
    }

    #[tokio::test]
    async fn test_email_detection_end_to_end() {
        let pool = setup_test_db().await;
        let mut manager = manager_with(&pool, |_| {});
        // Replace the real email adapter so no SMTP server is needed.
        manager.register_channel("email", Arc::new(AlwaysOkChannel { name: "email" }));
        let message = NotificationMessage::new("Hi", "Test");

        let response = manager
            .send("user@example.com", &message, None)
            .await
            .expect("send failed");
        assert!(response.is_success());
        assert_eq!(response.channel.as_deref(), Some("email"));

        let repository = SqlxDeliveryLogRepository::new(pool.clone());
        let logs = repository.list_recent(10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, "sent");
        assert_eq!(logs[0].channel.as_deref(), Some("email"));
        assert_eq!(logs[0].recipient, "user@example.com");
    }

    #[tokio::test]
    async fn test_unconfigured_sms_records_failure() {
        let pool = setup_test_db().await;
        let manager = manager_with(&pool, |_| {});
        let message = NotificationMessage::new("Code", "123456");

        // Auto-detected as sms; the default config has no Twilio account.
        let response = manager
            .send("+12025550123", &message, None)
            .await
            .expect("send failed");
        assert!(response.is_failure());
        assert_eq!(
            response.error.as_deref(),
            Some("SMS channel not configured")
        );

        let repository = SqlxDeliveryLogRepository::new(pool.clone());
        let logs = repository.list_recent(10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, "failed");
        assert_eq!(logs[0].channel.as_deref(), Some("sms"));
        assert_eq!(logs[0].error.as_deref(), Some("SMS channel not configured"));
        assert!(logs[0].failed_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_channel_records_nothing() {
        let pool = setup_test_db().await;
        let manager = manager_with(&pool, |_| {});
        let message = NotificationMessage::new("Hi", "Test");

        let err = manager
            .send("anyone", &message, Some("pigeon"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChannelNotFound(_)));

        assert_eq!(count_rows(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_throw_on_failure_records_before_erroring() {
        let pool = setup_test_db().await;
        let manager = manager_with(&pool, |config| {
            config.reliability.throw_on_failure = true;
        });
        let message = NotificationMessage::new("Code", "123456");

        let err = manager
            .send("+12025550123", &message, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotificationFailed(_)));

        // The attempt is logged before the policy raises.
        assert_eq!(count_rows(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_logging_disabled_records_nothing() {
        let pool = setup_test_db().await;
        let manager = manager_with(&pool, |config| {
            config.logging.enabled = false;
        });
        let message = NotificationMessage::new("Hi", "Test");

        let response = manager
            .send("anyone", &message, Some("mock"))
            .await
            .unwrap();
        assert!(response.is_success());

        assert_eq!(count_rows(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_records_each_attempt() {
        let pool = setup_test_db().await;
        let manager = manager_with(&pool, |_| {});
        let message = NotificationMessage::new("Maintenance", "Tonight at 22:00");

        let results = manager
            .broadcast(&["a", "b", "c"], &message, Some("mock"))
            .await;
        assert!(results.iter().all(|r| r.is_ok()));

        assert_eq!(count_rows(&pool).await, 3);
    }
}
