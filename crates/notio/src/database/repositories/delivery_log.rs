//! Delivery log repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::database::models::{DeliveryLogDbModel, DeliveryStatus};
use crate::{Error, Result};

/// Delivery log repository trait.
#[async_trait]
pub trait DeliveryLogRepository: Send + Sync {
    async fn insert(&self, log: &DeliveryLogDbModel) -> Result<()>;
    async fn get(&self, id: &str) -> Result<DeliveryLogDbModel>;
    async fn list_recent(&self, limit: i64) -> Result<Vec<DeliveryLogDbModel>>;
    async fn list_by_status(
        &self,
        status: DeliveryStatus,
        limit: i64,
    ) -> Result<Vec<DeliveryLogDbModel>>;
    async fn list_for_recipient(
        &self,
        recipient: &str,
        limit: i64,
    ) -> Result<Vec<DeliveryLogDbModel>>;
    async fn list_for_channel(
        &self,
        channel: &str,
        status: Option<DeliveryStatus>,
        limit: i64,
    ) -> Result<Vec<DeliveryLogDbModel>>;
    async fn count_by_status(&self, status: DeliveryStatus) -> Result<i64>;
}

/// SQLx implementation of DeliveryLogRepository.
pub struct SqlxDeliveryLogRepository {
    pool: SqlitePool,
}

impl SqlxDeliveryLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryLogRepository for SqlxDeliveryLogRepository {
    async fn insert(&self, log: &DeliveryLogDbModel) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO delivery_logs (
                id, recipient, channel, title, body, data, status,
                message_id, error, provider_response, attempts,
                sent_at, failed_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&log.id)
        .bind(&log.recipient)
        .bind(&log.channel)
        .bind(&log.title)
        .bind(&log.body)
        .bind(&log.data)
        .bind(&log.status)
        .bind(&log.message_id)
        .bind(&log.error)
        .bind(&log.provider_response)
        .bind(log.attempts)
        .bind(&log.sent_at)
        .bind(&log.failed_at)
        .bind(&log.created_at)
        .bind(&log.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<DeliveryLogDbModel> {
        sqlx::query_as::<_, DeliveryLogDbModel>("SELECT * FROM delivery_logs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::Other(format!("Delivery log '{}' not found", id)))
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<DeliveryLogDbModel>> {
        let logs = sqlx::query_as::<_, DeliveryLogDbModel>(
            "SELECT * FROM delivery_logs ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    async fn list_by_status(
        &self,
        status: DeliveryStatus,
        limit: i64,
    ) -> Result<Vec<DeliveryLogDbModel>> {
        let logs = sqlx::query_as::<_, DeliveryLogDbModel>(
            "SELECT * FROM delivery_logs WHERE status = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(status.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    async fn list_for_recipient(
        &self,
        recipient: &str,
        limit: i64,
    ) -> Result<Vec<DeliveryLogDbModel>> {
        let logs = sqlx::query_as::<_, DeliveryLogDbModel>(
            "SELECT * FROM delivery_logs WHERE recipient = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(recipient)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    async fn list_for_channel(
        &self,
        channel: &str,
        status: Option<DeliveryStatus>,
        limit: i64,
    ) -> Result<Vec<DeliveryLogDbModel>> {
        let logs = match status {
            Some(status) => {
                sqlx::query_as::<_, DeliveryLogDbModel>(
                    "SELECT * FROM delivery_logs WHERE channel = ? AND status = ? \
                     ORDER BY created_at DESC LIMIT ?",
                )
                .bind(channel)
                .bind(status.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, DeliveryLogDbModel>(
                    "SELECT * FROM delivery_logs WHERE channel = ? ORDER BY created_at DESC LIMIT ?",
                )
                .bind(channel)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(logs)
    }

    async fn count_by_status(&self, status: DeliveryStatus) -> Result<i64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM delivery_logs WHERE status = ?")
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0)
    }
}
