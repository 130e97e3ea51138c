//! # Task Request Validation
//!
//! Instance-based validator for task creation payloads, constructed at
//! startup and injected into the orchestrator. Violations are collected, not
//! short-circuited, so the caller sees every problem at once.

use url::Url;

use crate::error::FieldViolation;
use crate::models::CreateTaskRequest;

/// HTTP verbs accepted for outbound calls (matched case-insensitively).
pub const RECOGNIZED_METHODS: [&str; 9] = [
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "CONNECT", "OPTIONS", "TRACE",
];

/// Validates task creation requests. Stateless, cheap to clone, and held by
/// the orchestrator rather than living behind a process-wide singleton.
#[derive(Debug, Clone, Default)]
pub struct TaskValidator;

impl TaskValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a creation request, returning every violation found.
    pub fn validate_create(&self, request: &CreateTaskRequest) -> Vec<FieldViolation> {
        let mut violations = Vec::new();

        if request.url.is_empty() {
            violations.push(FieldViolation::required("url"));
        } else if Url::parse(&request.url).is_err() {
            violations.push(FieldViolation::new("url", "url", "is not a valid URL"));
        }

        if request.method.is_empty() {
            violations.push(FieldViolation::required("method"));
        } else if !is_recognized_method(&request.method) {
            violations.push(FieldViolation::new(
                "method",
                "http-method",
                "invalid http method",
            ));
        }

        for (name, value) in &request.headers {
            if value.is_empty() {
                violations.push(FieldViolation::new(
                    format!("headers.{name}"),
                    "required",
                    "header value must not be empty",
                ));
            }
        }

        violations
    }
}

fn is_recognized_method(method: &str) -> bool {
    let upper = method.to_uppercase();
    RECOGNIZED_METHODS.contains(&upper.as_str())
}
