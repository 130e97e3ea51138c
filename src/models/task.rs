//! # Task Model
//!
//! Core model for one outbound HTTP call and its recorded outcome.
//!
//! ## Database Schema
//!
//! Maps to the `task` table:
//! - `id`: Primary key (BIGSERIAL), assigned by the store exactly once
//! - `method` / `url`: the request descriptor supplied by the caller
//! - `status`: lifecycle state (see [`TaskState`])
//! - `response_status_code` / `response_length`: terminal-success result,
//!   set together or both absent
//!
//! Header rows live in the `headers` table tagged with the owning task id and
//! an `input` flag. Input headers are written at creation, output headers at
//! completion; neither is mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::states::TaskState;

/// Direction of a header relative to the outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderDirection {
    /// Supplied by the caller, sent with the outbound request
    Input,
    /// Received in the response, persisted on completion
    Output,
}

impl HeaderDirection {
    /// Value of the `input` column for this direction.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input)
    }

    pub fn from_input_flag(input: bool) -> Self {
        if input {
            Self::Input
        } else {
            Self::Output
        }
    }
}

/// One HTTP header attached to a task. Names are free-form and may repeat
/// within a task; values are required non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
    pub direction: HeaderDirection,
}

impl Header {
    pub fn input(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            direction: HeaderDirection::Input,
        }
    }

    pub fn output(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            direction: HeaderDirection::Output,
        }
    }
}

/// A task execution instance: request descriptor, lifecycle status, and the
/// recorded outcome once terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub method: String,
    pub url: String,
    pub status: TaskState,
    pub response_status_code: Option<i64>,
    pub response_length: Option<i64>,
    pub headers: Vec<Header>,
}

impl Task {
    pub fn input_headers(&self) -> impl Iterator<Item = &Header> {
        self.headers
            .iter()
            .filter(|h| h.direction == HeaderDirection::Input)
    }

    pub fn output_headers(&self) -> impl Iterator<Item = &Header> {
        self.headers
            .iter()
            .filter(|h| h.direction == HeaderDirection::Output)
    }
}

/// New task for creation (no id yet; status is fixed to `new`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub method: String,
    pub url: String,
    pub headers: Vec<Header>,
}

impl NewTask {
    pub fn from_request(request: &CreateTaskRequest) -> Self {
        let headers = request
            .headers
            .iter()
            .map(|(name, value)| Header::input(name.clone(), value.clone()))
            .collect();
        Self {
            method: request.method.clone(),
            url: request.url.clone(),
            headers,
        }
    }
}

/// Validated task-creation payload handed over by the API adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}
