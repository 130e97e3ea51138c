//! # Outbound Caller
//!
//! Performs exactly one outbound HTTP call for a task and persists its
//! outcome. State machine: `new → in_process → {done | error}`. The
//! `in_process` write always precedes network I/O, and the terminal write is
//! always attempted after the call completes. Every failure path is terminal
//! for the attempt: there is no automatic retry; failures are logged and
//! reflected only in the task's status, never propagated to a caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, error, info};

use crate::error::TaskError;
use crate::messaging::TaskMessage;
use crate::models::{Header, Task, TaskState};
use crate::store::TaskStore;

/// Executes one task. Implementations report nothing back; the outcome
/// lives in the task row.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, message: TaskMessage);
}

/// Outbound caller backed by a shared reqwest client with a bounded
/// per-request timeout.
pub struct HttpTaskExecutor {
    store: Arc<dyn TaskStore>,
    client: reqwest::Client,
}

impl HttpTaskExecutor {
    pub fn new(store: Arc<dyn TaskStore>, request_timeout: Duration) -> Result<Self, TaskError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TaskError::internal(format!("failed to build http client: {e}")))?;
        Ok(Self { store, client })
    }

    fn build_request(&self, message: &TaskMessage) -> Result<reqwest::Request, TaskError> {
        let method = reqwest::Method::from_bytes(message.method.to_uppercase().as_bytes())
            .map_err(|e| TaskError::internal(format!("invalid method: {e}")))?;
        let url = reqwest::Url::parse(&message.url)
            .map_err(|e| TaskError::internal(format!("invalid url: {e}")))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &message.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TaskError::internal(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TaskError::internal(format!("invalid header value: {e}")))?;
            headers.append(name, value);
        }

        self.client
            .request(method, url)
            .headers(headers)
            .build()
            .map_err(|e| TaskError::internal(format!("failed to build request: {e}")))
    }

    /// Best-effort terminal `error` status; secondary failures are only logged.
    async fn set_error_status(&self, task_id: i64) {
        if let Err(e) = self.store.update_status(task_id, TaskState::Error).await {
            error!(task_id, error = %e, "failed to set error status");
        }
    }
}

#[async_trait]
impl TaskExecutor for HttpTaskExecutor {
    async fn execute(&self, message: TaskMessage) {
        let task_id = message.task_id;

        match self.store.mark_in_process(task_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(task_id, "task already terminal, skipping redelivered message");
                return;
            }
            Err(e) => {
                error!(task_id, error = %e, "failed to mark task in_process, aborting");
                return;
            }
        }

        let request = match self.build_request(&message) {
            Ok(request) => request,
            Err(e) => {
                error!(task_id, error = %e, "failed to build outbound request");
                self.set_error_status(task_id).await;
                return;
            }
        };

        debug!(task_id, method = %message.method, url = %message.url, "executing outbound call");

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(task_id, error = %e, timed_out = e.is_timeout(), "outbound call failed");
                self.set_error_status(task_id).await;
                return;
            }
        };

        // Capture code and headers before the body is consumed.
        let status_code = i64::from(response.status().as_u16());
        let output_headers = flatten_headers(response.headers());

        let response_length = match drain_body(response).await {
            Ok(length) => length,
            Err(e) => {
                error!(task_id, error = %e, "failed to drain response body");
                self.set_error_status(task_id).await;
                return;
            }
        };

        let updated = Task {
            id: task_id,
            method: message.method,
            url: message.url,
            status: TaskState::Done,
            response_status_code: Some(status_code),
            response_length: Some(response_length),
            headers: output_headers,
        };

        if let Err(e) = self.store.update_result(&updated).await {
            error!(task_id, error = %e, "failed to persist task result");
            self.set_error_status(task_id).await;
            return;
        }

        info!(
            task_id,
            status_code, response_length, "task executed successfully"
        );
    }
}

/// Flatten response headers into output header rows; multi-valued headers
/// are joined with a comma.
fn flatten_headers(headers: &HeaderMap) -> Vec<Header> {
    headers
        .keys()
        .map(|name| {
            let value = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(",");
            Header::output(name.as_str(), value)
        })
        .collect()
}

/// Fully drain the body counting bytes; the content itself is discarded.
async fn drain_body(mut response: reqwest::Response) -> Result<i64, reqwest::Error> {
    let mut length: i64 = 0;
    while let Some(chunk) = response.chunk().await? {
        length += chunk.len() as i64;
    }
    Ok(length)
}
