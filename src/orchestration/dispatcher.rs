//! # In-Process Dispatcher
//!
//! Direct dispatch path for deployments without a broker: the producer side
//! of the hand-off is a bounded in-memory channel, consumed by a local loop
//! that runs the executor. Fire-and-forget by contract; once a message is
//! accepted into the channel the caller learns nothing more about it, and a
//! process crash loses whatever the channel holds.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info};

use crate::executor::TaskExecutor;
use crate::messaging::{MessagingError, MessagingResult, TaskMessage, TaskProducer};

/// Producer that hands messages to an executor loop inside the same process.
pub struct InProcessDispatcher {
    sender: mpsc::Sender<TaskMessage>,
    worker: JoinHandle<()>,
}

impl InProcessDispatcher {
    /// Spawn the consuming loop. `capacity` bounds the number of accepted
    /// but not yet started messages; `max_workers` bounds concurrent
    /// executions.
    pub fn start(
        executor: Arc<dyn TaskExecutor>,
        capacity: usize,
        max_workers: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        let worker = tokio::spawn(dispatch_loop(receiver, executor, max_workers));
        Self { sender, worker }
    }

    /// Stop accepting messages and wait for in-flight executions to finish.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.worker.await {
            error!(error = %e, "dispatch loop panicked");
        }
    }
}

async fn dispatch_loop(
    mut receiver: mpsc::Receiver<TaskMessage>,
    executor: Arc<dyn TaskExecutor>,
    max_workers: usize,
) {
    info!(max_workers, "starting in-process dispatch loop");
    let mut in_flight: JoinSet<()> = JoinSet::new();

    while let Some(message) = receiver.recv().await {
        while in_flight.len() >= max_workers {
            if let Some(Err(e)) = in_flight.join_next().await {
                error!(error = %e, "dispatch worker panicked");
            }
        }
        let executor = Arc::clone(&executor);
        in_flight.spawn(async move {
            executor.execute(message).await;
        });
    }

    // Channel closed: drain everything still running.
    while let Some(result) = in_flight.join_next().await {
        if let Err(e) = result {
            error!(error = %e, "dispatch worker panicked during drain");
        }
    }
    info!("in-process dispatch loop stopped");
}

#[async_trait]
impl TaskProducer for InProcessDispatcher {
    async fn publish(&self, message: &TaskMessage) -> MessagingResult<()> {
        self.sender
            .send(message.clone())
            .await
            .map_err(|_| MessagingError::internal("dispatch loop is no longer running"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingExecutor {
        executed: Mutex<Vec<i64>>,
        concurrent: AtomicUsize,
        peak: AtomicUsize,
    }

    impl RecordingExecutor {
        fn new() -> Self {
            Self {
                executed: Mutex::new(Vec::new()),
                concurrent: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TaskExecutor for RecordingExecutor {
        async fn execute(&self, message: TaskMessage) {
            let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.executed.lock().unwrap().push(message.task_id);
            self.concurrent.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn message(task_id: i64) -> TaskMessage {
        TaskMessage::new(
            task_id,
            "GET".to_string(),
            "https://example.com".to_string(),
            HashMap::new(),
        )
    }

    #[tokio::test]
    async fn test_dispatch_executes_all_published_messages() {
        let executor = Arc::new(RecordingExecutor::new());
        let dispatcher = InProcessDispatcher::start(Arc::clone(&executor) as Arc<dyn TaskExecutor>, 16, 2);

        for id in 1..=8 {
            dispatcher.publish(&message(id)).await.unwrap();
        }
        dispatcher.shutdown().await;

        let mut executed = executor.executed.lock().unwrap().clone();
        executed.sort_unstable();
        assert_eq!(executed, (1..=8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_worker_bound_is_respected() {
        let executor = Arc::new(RecordingExecutor::new());
        let dispatcher = InProcessDispatcher::start(Arc::clone(&executor) as Arc<dyn TaskExecutor>, 32, 3);

        for id in 1..=12 {
            dispatcher.publish(&message(id)).await.unwrap();
        }
        dispatcher.shutdown().await;

        assert!(executor.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(executor.executed.lock().unwrap().len(), 12);
    }

    #[tokio::test]
    async fn test_publish_after_shutdown_fails() {
        let executor = Arc::new(RecordingExecutor::new());
        let dispatcher = InProcessDispatcher::start(Arc::clone(&executor) as Arc<dyn TaskExecutor>, 4, 1);

        let sender = dispatcher.sender.clone();
        dispatcher.shutdown().await;

        // The loop has exited; the retained sender now has no receiver.
        assert!(sender.send(message(1)).await.is_err());
    }
}
