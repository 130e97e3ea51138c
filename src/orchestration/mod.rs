//! # Orchestration
//!
//! Coordinates the task lifecycle: request validation, durable creation,
//! and hand-off to the execution side. Two hand-off strategies are
//! available behind the same producer trait: the durable queue producer
//! (see `messaging`) and a direct in-process dispatcher.

pub mod dispatcher;
pub mod lifecycle;

pub use dispatcher::InProcessDispatcher;
pub use lifecycle::TaskLifecycle;
