//! # HttpTask Core
//!
//! Asynchronous outbound-HTTP task execution pipeline backed by PostgreSQL.
//!
//! ## Overview
//!
//! A task is a description of one outbound HTTP call: a method, a URL, and
//! a set of request headers. Creation persists the task and hands it to the
//! execution side through a durable queue; execution performs the call once
//! and records the response status code, body length, and response headers
//! back onto the task. Callers observe progress through the task's status:
//! `new → in_process → {done | error}`.
//!
//! ## Module Organization
//!
//! - [`models`] - Task, header, and state machine types
//! - [`store`] - Transactional task + header persistence
//! - [`executor`] - The outbound caller
//! - [`messaging`] - Durable queue producer/consumer bridge (pgmq)
//! - [`orchestration`] - Lifecycle coordination and direct dispatch
//! - [`validation`] - Creation request validation
//! - [`error`] - Structured error handling and classification
//! - [`config`] - YAML configuration with environment overrides
//! - [`database`] - Pool construction and migrations
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use httptask_core::config::ConfigManager;
//! use httptask_core::database;
//! use httptask_core::executor::HttpTaskExecutor;
//! use httptask_core::messaging::{PgmqClient, PgmqTaskProducer};
//! use httptask_core::orchestration::TaskLifecycle;
//! use httptask_core::store::PgTaskStore;
//! use httptask_core::validation::TaskValidator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//!
//! let pool = database::establish_pool(&config.database).await?;
//! database::run_migrations(&pool).await?;
//!
//! let store = Arc::new(PgTaskStore::new(pool.clone()));
//! let client = Arc::new(PgmqClient::new_with_pool(pool).await);
//! let producer = PgmqTaskProducer::new(client, &config.pgmq.task_queue);
//! producer.initialize().await?;
//!
//! let lifecycle = TaskLifecycle::new(store, Arc::new(producer), TaskValidator::new());
//! # let _ = lifecycle;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod executor;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod orchestration;
pub mod store;
pub mod validation;

pub use error::{ErrorKind, FieldViolation, Result, TaskError};
pub use executor::{HttpTaskExecutor, TaskExecutor};
pub use models::{CreateTaskRequest, Header, HeaderDirection, NewTask, Task, TaskState};
pub use orchestration::{InProcessDispatcher, TaskLifecycle};
pub use store::{PgTaskStore, TaskStore};
pub use validation::TaskValidator;
