//! # Work Queue Bridge
//!
//! Durable-queue producer/consumer pairing that decouples task creation from
//! task execution across process boundaries. The producer publishes one
//! [`TaskMessage`] per created task (confirmed before the creation call
//! returns); the consumer pulls messages one at a time through a bounded
//! worker pool and hands each to the outbound caller.
//!
//! Delivery is at-least-once: a message is acked (deleted) only after the
//! worker finishes, and a crash in between redelivers it once the visibility
//! timeout elapses.

pub mod consumer;
pub mod errors;
pub mod message;
pub mod pgmq_client;
pub mod producer;

pub use consumer::TaskQueueConsumer;
pub use errors::{MessagingError, MessagingResult};
pub use message::{TaskMessage, TaskMessageMetadata};
pub use pgmq_client::PgmqClient;
pub use producer::{PgmqTaskProducer, TaskProducer};

/// One message pulled from a queue, broker-agnostic.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub msg_id: i64,
    pub read_count: i32,
    pub payload: serde_json::Value,
}

/// Queue operations needed by the bridge, behind a trait so tests can
/// substitute an in-memory broker.
#[async_trait::async_trait]
pub trait QueueClient: Send + Sync {
    async fn create_queue(&self, queue_name: &str) -> MessagingResult<()>;

    async fn send_json(
        &self,
        queue_name: &str,
        message: &serde_json::Value,
    ) -> MessagingResult<i64>;

    async fn read_one(
        &self,
        queue_name: &str,
        visibility_timeout: Option<i32>,
    ) -> MessagingResult<Option<QueueMessage>>;

    async fn delete(&self, queue_name: &str, message_id: i64) -> MessagingResult<()>;

    async fn archive(&self, queue_name: &str, message_id: i64) -> MessagingResult<()>;
}
