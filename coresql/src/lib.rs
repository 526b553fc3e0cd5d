//! Database readiness and test-isolation utilities for MySQL.
//!
//! This crate covers the glue every service needs around its database and
//! nothing more: a bounded-retry connection waiter for containerized startup
//! races, a bounded-timeout connection factory, command-line dispatch into a
//! migration engine, and parallel table truncation for test isolation. Actual
//! pooling and migration execution are delegated to [`sqlx`].

pub mod agent;
pub mod config;
pub mod connect;
pub mod error;
pub mod migrations;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod wait;

pub use agent::SqlAgent;
pub use config::{MySqlConnectionConfig, TruncateConfig, WaitConfig};
pub use connect::Database;
pub use error::{DbError, DbResult};
pub use migrations::{Migrations, SqlxMigrations, handle_migration_args, must_migrate_up};
pub use wait::wait_for_connection;
