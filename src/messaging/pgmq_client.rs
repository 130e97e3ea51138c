//! # PostgreSQL Message Queue Client (pgmq-rs)
//!
//! Durable queue client backing the work queue bridge. pgmq gives the same
//! at-least-once contract as a log-based broker: a message read with a
//! visibility timeout reappears if the consumer dies before deleting it.

use pgmq::PGMQueue;
use tracing::{debug, info};

use super::errors::{MessagingError, MessagingResult};
use super::{QueueClient, QueueMessage};

/// pgmq-rs based queue client, cloneable and safe to share across workers.
#[derive(Debug, Clone)]
pub struct PgmqClient {
    pgmq: PGMQueue,
}

impl PgmqClient {
    /// Create new pgmq client using a connection string
    pub async fn new(database_url: &str) -> MessagingResult<Self> {
        info!("Connecting to pgmq");
        let pgmq = PGMQueue::new(database_url.to_string()).await?;
        Ok(Self { pgmq })
    }

    /// Create new pgmq client reusing an existing connection pool
    pub async fn new_with_pool(pool: sqlx::PgPool) -> Self {
        debug!("Creating pgmq client with shared connection pool");
        let pgmq = PGMQueue::new_with_pool(pool).await;
        Self { pgmq }
    }

    /// Get reference to the underlying connection pool
    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pgmq.connection
    }
}

#[async_trait::async_trait]
impl QueueClient for PgmqClient {
    async fn create_queue(&self, queue_name: &str) -> MessagingResult<()> {
        debug!("Creating queue: {}", queue_name);
        self.pgmq.create(queue_name).await.map_err(|e| {
            MessagingError::queue_operation(queue_name, "create", e.to_string())
        })?;
        Ok(())
    }

    async fn send_json(
        &self,
        queue_name: &str,
        message: &serde_json::Value,
    ) -> MessagingResult<i64> {
        let message_id = self.pgmq.send(queue_name, message).await.map_err(|e| {
            MessagingError::queue_operation(queue_name, "send", e.to_string())
        })?;
        debug!(
            "Message sent to queue: {} with id: {}",
            queue_name, message_id
        );
        Ok(message_id)
    }

    async fn read_one(
        &self,
        queue_name: &str,
        visibility_timeout: Option<i32>,
    ) -> MessagingResult<Option<QueueMessage>> {
        let message = self
            .pgmq
            .read::<serde_json::Value>(queue_name, visibility_timeout)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "read", e.to_string()))?;

        Ok(message.map(|msg| QueueMessage {
            msg_id: msg.msg_id,
            read_count: msg.read_ct,
            payload: msg.message,
        }))
    }

    async fn delete(&self, queue_name: &str, message_id: i64) -> MessagingResult<()> {
        self.pgmq.delete(queue_name, message_id).await.map_err(|e| {
            MessagingError::queue_operation(queue_name, "delete", e.to_string())
        })?;
        debug!("Message deleted: {} from queue: {}", message_id, queue_name);
        Ok(())
    }

    async fn archive(&self, queue_name: &str, message_id: i64) -> MessagingResult<()> {
        self.pgmq.archive(queue_name, message_id).await.map_err(|e| {
            MessagingError::queue_operation(queue_name, "archive", e.to_string())
        })?;
        debug!("Message archived: {} from queue: {}", message_id, queue_name);
        Ok(())
    }
}
