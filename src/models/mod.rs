//! Data layer: the task model, its headers, and the lifecycle state machine.

pub mod states;
pub mod task;

pub use states::TaskState;
pub use task::{CreateTaskRequest, Header, HeaderDirection, NewTask, Task};
