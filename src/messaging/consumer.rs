//! # Task Queue Consumer
//!
//! Long-running consumer loop for the execution process. Pulls one message
//! at a time and hands each to the outbound caller through a bounded worker
//! pool: a semaphore permit is acquired BEFORE the next read, so when all
//! workers are busy the loop blocks against the broker instead of buffering
//! messages in memory.
//!
//! Failure tolerance: read errors are logged and the loop continues; a
//! payload that cannot be deserialized is archived so it stops redelivering.
//! On a stop signal the loop stops pulling, drains every in-flight worker to
//! its terminal store write, and releases the broker connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::message::TaskMessage;
use super::QueueClient;
use crate::executor::TaskExecutor;

/// Consumer side of the work queue bridge.
pub struct TaskQueueConsumer {
    client: Arc<dyn QueueClient>,
    executor: Arc<dyn TaskExecutor>,
    queue_name: String,
    max_workers: usize,
    visibility_timeout_seconds: i32,
    poll_interval: Duration,
}

impl TaskQueueConsumer {
    pub fn new(
        client: Arc<dyn QueueClient>,
        executor: Arc<dyn TaskExecutor>,
        queue_name: impl Into<String>,
        max_workers: usize,
        visibility_timeout_seconds: i32,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            executor,
            queue_name: queue_name.into(),
            max_workers,
            visibility_timeout_seconds,
            poll_interval,
        }
    }

    /// Run the consume loop until `shutdown` flips to true, then drain.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            queue = %self.queue_name,
            max_workers = self.max_workers,
            "starting task queue consumer"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut in_flight: JoinSet<()> = JoinSet::new();

        loop {
            // Reap finished workers so the join set does not grow unbounded.
            while let Some(result) = in_flight.try_join_next() {
                if let Err(e) = result {
                    error!(error = %e, "task worker panicked");
                }
            }

            if *shutdown.borrow_and_update() {
                break;
            }

            // Backpressure: hold a worker slot before touching the broker.
            let permit = tokio::select! {
                _ = shutdown.changed() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let read = tokio::select! {
                _ = shutdown.changed() => {
                    drop(permit);
                    break;
                }
                read = self
                    .client
                    .read_one(&self.queue_name, Some(self.visibility_timeout_seconds)) => read,
            };

            let message = match read {
                Ok(Some(message)) => message,
                Ok(None) => {
                    drop(permit);
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                    continue;
                }
                Err(e) => {
                    warn!(queue = %self.queue_name, error = %e, "error reading message, continuing");
                    drop(permit);
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                    continue;
                }
            };

            let task_message = match TaskMessage::from_json(message.payload.clone()) {
                Ok(task_message) => task_message,
                Err(e) => {
                    error!(
                        queue = %self.queue_name,
                        msg_id = message.msg_id,
                        error = %e,
                        "undeliverable message payload, archiving"
                    );
                    if let Err(archive_err) =
                        self.client.archive(&self.queue_name, message.msg_id).await
                    {
                        warn!(error = %archive_err, "failed to archive undeliverable message");
                    }
                    drop(permit);
                    continue;
                }
            };

            debug!(
                task_id = task_message.task_id,
                msg_id = message.msg_id,
                read_count = message.read_count,
                "dispatching task to worker"
            );

            let client = Arc::clone(&self.client);
            let executor = Arc::clone(&self.executor);
            let queue_name = self.queue_name.clone();
            in_flight.spawn(async move {
                let _permit = permit;
                executor.execute(task_message).await;
                // Ack only after the worker finished; a crash before this
                // point redelivers the message (at-least-once).
                if let Err(e) = client.delete(&queue_name, message.msg_id).await {
                    warn!(msg_id = message.msg_id, error = %e, "failed to ack processed message");
                }
            });
        }

        info!(
            queue = %self.queue_name,
            in_flight = in_flight.len(),
            "consumer stopping, draining in-flight workers"
        );
        while let Some(result) = in_flight.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "task worker panicked during drain");
            }
        }
        info!(queue = %self.queue_name, "consumer stopped");
    }
}
