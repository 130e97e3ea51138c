//! # Task Lifecycle Orchestrator
//!
//! Use-case layer: validate a creation request, persist the task, and hand
//! it off for execution. The hand-off is confirmed before `create` returns;
//! if publishing fails the created row is deleted again (compensation) so no
//! task exists that nothing will ever execute.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{FieldViolation, Result, TaskError};
use crate::messaging::{TaskMessage, TaskProducer};
use crate::models::{CreateTaskRequest, NewTask, Task};
use crate::store::TaskStore;
use crate::validation::TaskValidator;

/// Validates, creates, and dispatches tasks. The validator is injected at
/// construction; there is no process-wide validation singleton.
pub struct TaskLifecycle {
    store: Arc<dyn TaskStore>,
    producer: Arc<dyn TaskProducer>,
    validator: TaskValidator,
}

impl TaskLifecycle {
    pub fn new(
        store: Arc<dyn TaskStore>,
        producer: Arc<dyn TaskProducer>,
        validator: TaskValidator,
    ) -> Self {
        Self {
            store,
            producer,
            validator,
        }
    }

    /// Create a task and arrange for its execution.
    ///
    /// The caller gets the stored task back before execution happens; the
    /// execution outcome is only ever visible through a later lookup.
    pub async fn create(&self, request: CreateTaskRequest) -> Result<Task> {
        let violations = self.validator.validate_create(&request);
        if !violations.is_empty() {
            return Err(TaskError::validation(violations));
        }

        let task = self.store.create(NewTask::from_request(&request)).await?;

        let message = TaskMessage::from_task(&task);
        if let Err(publish_err) = self.producer.publish(&message).await {
            warn!(
                task_id = task.id,
                error = %publish_err,
                "queue publish failed, compensating with task delete"
            );
            if let Err(delete_err) = self.store.delete(task.id).await {
                return Err(TaskError::internal(format!(
                    "publish failed ({publish_err}) and compensation delete failed: {delete_err}"
                )));
            }
            return Err(TaskError::Queue(publish_err));
        }

        info!(task_id = task.id, method = %task.method, "task created and dispatched");
        Ok(task)
    }

    /// Retrieve a task with its output headers.
    pub async fn get_by_id_with_output_headers(&self, id: i64) -> Result<Task> {
        if id <= 0 {
            return Err(TaskError::validation(vec![FieldViolation::new(
                "id",
                "invalid",
                "must be a positive integer",
            )]));
        }
        self.store.get_by_id_with_output_headers(id).await
    }
}
