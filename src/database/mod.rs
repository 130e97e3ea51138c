//! # Database
//!
//! Connection pool construction and schema migrations.

pub mod connection;
pub mod migrations;

pub use connection::establish_pool;
pub use migrations::{run_migrations, MIGRATOR};
