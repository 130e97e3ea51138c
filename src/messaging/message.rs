//! # Queue Wire Format
//!
//! Message structure published for every created task and consumed by the
//! execution side. One topic, one consumer group, at-least-once delivery.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::Task;

/// Message describing one outbound call to execute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMessage {
    /// Database task ID
    pub task_id: i64,
    /// HTTP method as supplied by the caller (case preserved)
    pub method: String,
    /// Target URL
    pub url: String,
    /// Input headers to send with the outbound request
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Message metadata
    #[serde(default)]
    pub metadata: TaskMessageMetadata,
}

/// Metadata for task messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMessageMetadata {
    /// When the message was published
    pub enqueued_at: chrono::DateTime<chrono::Utc>,
    /// Correlation ID for tracing a task across processes
    pub correlation_id: String,
}

impl Default for TaskMessageMetadata {
    fn default() -> Self {
        Self {
            enqueued_at: chrono::Utc::now(),
            correlation_id: Uuid::new_v4().to_string(),
        }
    }
}

impl TaskMessage {
    pub fn new(task_id: i64, method: String, url: String, headers: HashMap<String, String>) -> Self {
        Self {
            task_id,
            method,
            url,
            headers,
            metadata: TaskMessageMetadata::default(),
        }
    }

    /// Build the message for a freshly created task. Only input headers are
    /// carried on the wire; output headers do not exist yet.
    pub fn from_task(task: &Task) -> Self {
        let headers = task
            .input_headers()
            .map(|h| (h.name.clone(), h.value.clone()))
            .collect();
        Self::new(task.id, task.method.clone(), task.url.clone(), headers)
    }

    /// Convert to JSON for queue storage
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Parse from a raw queue payload
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}
