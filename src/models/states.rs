use serde::{Deserialize, Serialize};
use std::fmt;

/// Task state definitions for the execution lifecycle.
///
/// Status only moves forward: `new → in_process → {done | error}`.
/// `error` is reachable from any non-terminal state because request
/// construction can fail before the call starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Initial state when the task row is created
    New,
    /// The outbound call is being executed
    InProcess,
    /// Call completed and the result was persisted
    Done,
    /// Execution failed; result fields stay null
    Error,
}

impl TaskState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Check whether a forward transition to `next` is allowed.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        match self {
            Self::New => matches!(next, Self::InProcess | Self::Error),
            Self::InProcess => matches!(next, Self::Done | Self::Error),
            Self::Done | Self::Error => false,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::InProcess => write!(f, "in_process"),
            Self::Done => write!(f, "done"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "in_process" => Ok(Self::InProcess),
            "done" => Ok(Self::Done),
            "error" => Ok(Self::Error),
            _ => Err(format!("Invalid task state: {s}")),
        }
    }
}
