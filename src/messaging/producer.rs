//! # Task Producer
//!
//! Producer side of the work queue bridge. Publishing is synchronous from
//! the caller's perspective: creation does not report success until the
//! broker has accepted the message, so a failed publish can be compensated
//! by deleting the just-created task row.

use std::sync::Arc;

use tracing::debug;

use super::errors::MessagingResult;
use super::message::TaskMessage;
use super::QueueClient;

/// Hand-off point for newly created tasks.
#[async_trait::async_trait]
pub trait TaskProducer: Send + Sync {
    /// Publish a task for execution. Returns only after the message is
    /// accepted (or an error occurred).
    async fn publish(&self, message: &TaskMessage) -> MessagingResult<()>;
}

/// Publishes task messages to a single pgmq queue.
pub struct PgmqTaskProducer {
    client: Arc<dyn QueueClient>,
    queue_name: String,
}

impl PgmqTaskProducer {
    pub fn new(client: Arc<dyn QueueClient>, queue_name: impl Into<String>) -> Self {
        Self {
            client,
            queue_name: queue_name.into(),
        }
    }

    /// Ensure the backing queue exists. Idempotent; called once at startup.
    pub async fn initialize(&self) -> MessagingResult<()> {
        self.client.create_queue(&self.queue_name).await
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }
}

#[async_trait::async_trait]
impl TaskProducer for PgmqTaskProducer {
    async fn publish(&self, message: &TaskMessage) -> MessagingResult<()> {
        let payload = message.to_json()?;
        let message_id = self.client.send_json(&self.queue_name, &payload).await?;
        debug!(
            task_id = message.task_id,
            message_id,
            queue = %self.queue_name,
            "task message published"
        );
        Ok(())
    }
}
