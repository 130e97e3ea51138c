//! Shared test fixtures: a database pool gated on `TEST_DATABASE_URL`,
//! plus in-memory fakes for the store, the queue, and the executor.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::PgPool;

use httptask_core::error::TaskError;
use httptask_core::executor::TaskExecutor;
use httptask_core::messaging::{
    MessagingError, MessagingResult, QueueClient, QueueMessage, TaskMessage,
};
use httptask_core::models::{NewTask, Task, TaskState};
use httptask_core::store::TaskStore;

/// Connect to the test database and apply migrations. Returns `None` (and
/// the test should return early) when `TEST_DATABASE_URL` is not set.
pub async fn test_pool() -> Option<PgPool> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set, skipping database test");
            return None;
        }
    };
    let pool = PgPool::connect(&url)
        .await
        .expect("failed to connect to test database");
    httptask_core::database::MIGRATOR
        .run(&pool)
        .await
        .expect("failed to run migrations");
    Some(pool)
}

/// Store fake recording every call; `mark_in_process` behavior is
/// switchable to simulate redelivery and store outages.
#[derive(Default)]
pub struct MockStore {
    pub already_terminal: AtomicBool,
    pub fail_mark: AtomicBool,
    pub marked: Mutex<Vec<i64>>,
    pub status_updates: Mutex<Vec<(i64, TaskState)>>,
    pub results: Mutex<Vec<Task>>,
    next_id: AtomicI64,
}

#[async_trait]
impl TaskStore for MockStore {
    async fn create(&self, new_task: NewTask) -> httptask_core::Result<Task> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Task {
            id,
            method: new_task.method,
            url: new_task.url,
            status: TaskState::New,
            response_status_code: None,
            response_length: None,
            headers: new_task.headers,
        })
    }

    async fn get_by_id_with_output_headers(&self, id: i64) -> httptask_core::Result<Task> {
        Err(TaskError::NotFound { id })
    }

    async fn update_status(&self, id: i64, status: TaskState) -> httptask_core::Result<()> {
        self.status_updates.lock().unwrap().push((id, status));
        Ok(())
    }

    async fn mark_in_process(&self, id: i64) -> httptask_core::Result<bool> {
        if self.fail_mark.load(Ordering::SeqCst) {
            return Err(TaskError::internal("store unavailable"));
        }
        self.marked.lock().unwrap().push(id);
        Ok(!self.already_terminal.load(Ordering::SeqCst))
    }

    async fn update_result(&self, task: &Task) -> httptask_core::Result<()> {
        self.results.lock().unwrap().push(task.clone());
        Ok(())
    }

    async fn delete(&self, _: i64) -> httptask_core::Result<()> {
        Ok(())
    }
}

/// Queue fake over an in-memory deque. `read_one` pops; delivery tracking
/// records acks and archives separately.
#[derive(Default)]
pub struct InMemoryQueue {
    messages: Mutex<VecDeque<QueueMessage>>,
    next_msg_id: AtomicI64,
    pub deleted: Mutex<Vec<i64>>,
    pub archived: Mutex<Vec<i64>>,
}

impl InMemoryQueue {
    pub fn push_task(&self, message: &TaskMessage) {
        let payload = message.to_json().unwrap();
        self.push_payload(payload);
    }

    pub fn push_payload(&self, payload: serde_json::Value) {
        let msg_id = self.next_msg_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.messages.lock().unwrap().push_back(QueueMessage {
            msg_id,
            read_count: 1,
            payload,
        });
    }

    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl QueueClient for InMemoryQueue {
    async fn create_queue(&self, _queue_name: &str) -> MessagingResult<()> {
        Ok(())
    }

    async fn send_json(
        &self,
        _queue_name: &str,
        payload: &serde_json::Value,
    ) -> MessagingResult<i64> {
        let msg_id = self.next_msg_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.messages.lock().unwrap().push_back(QueueMessage {
            msg_id,
            read_count: 1,
            payload: payload.clone(),
        });
        Ok(msg_id)
    }

    async fn read_one(
        &self,
        _queue_name: &str,
        _visibility_timeout_seconds: Option<i32>,
    ) -> MessagingResult<Option<QueueMessage>> {
        Ok(self.messages.lock().unwrap().pop_front())
    }

    async fn delete(&self, _queue_name: &str, msg_id: i64) -> MessagingResult<()> {
        self.deleted.lock().unwrap().push(msg_id);
        Ok(())
    }

    async fn archive(&self, _queue_name: &str, msg_id: i64) -> MessagingResult<()> {
        self.archived.lock().unwrap().push(msg_id);
        Ok(())
    }
}

/// Queue fake that always fails to send, for hand-off failure paths.
pub struct FailingQueue;

#[async_trait]
impl QueueClient for FailingQueue {
    async fn create_queue(&self, _queue_name: &str) -> MessagingResult<()> {
        Ok(())
    }

    async fn send_json(
        &self,
        queue_name: &str,
        _payload: &serde_json::Value,
    ) -> MessagingResult<i64> {
        Err(MessagingError::queue_operation(
            queue_name,
            "send",
            "broker unavailable",
        ))
    }

    async fn read_one(
        &self,
        _queue_name: &str,
        _visibility_timeout_seconds: Option<i32>,
    ) -> MessagingResult<Option<QueueMessage>> {
        Ok(None)
    }

    async fn delete(&self, _queue_name: &str, _msg_id: i64) -> MessagingResult<()> {
        Ok(())
    }

    async fn archive(&self, _queue_name: &str, _msg_id: i64) -> MessagingResult<()> {
        Ok(())
    }
}

/// Executor fake measuring concurrency; each execution holds its slot for
/// `delay` to make overlap observable.
pub struct CountingExecutor {
    pub executed: Mutex<Vec<i64>>,
    pub concurrent: AtomicUsize,
    pub peak: AtomicUsize,
    pub delay: std::time::Duration,
}

impl CountingExecutor {
    pub fn new(delay: std::time::Duration) -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            concurrent: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn executed_count(&self) -> usize {
        self.executed.lock().unwrap().len()
    }
}

#[async_trait]
impl TaskExecutor for CountingExecutor {
    async fn execute(&self, message: TaskMessage) {
        let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.executed.lock().unwrap().push(message.task_id);
        self.concurrent.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn task_message(task_id: i64) -> TaskMessage {
    TaskMessage::new(
        task_id,
        "GET".to_string(),
        "https://example.com/hook".to_string(),
        HashMap::new(),
    )
}
