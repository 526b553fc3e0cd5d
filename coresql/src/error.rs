//! Error types and result definitions for database readiness and truncation
//! operations.

use std::time::Duration;

use thiserror::Error;

/// Convenient result type for database operations using [`DbError`] as the
/// error type.
pub type DbResult<T> = Result<T, DbError>;

/// Errors surfaced by connection, migration and truncation operations.
///
/// Transient probe failures are never surfaced individually; only the terminal
/// outcome of a wait session is reported. Truncation failures propagate the
/// failing table's underlying [`sqlx::Error`] verbatim through the transparent
/// [`DbError::Database`] variant, so callers can inspect driver-level detail.
#[derive(Debug, Error)]
pub enum DbError {
    /// The configured number of connection probes was exhausted before the
    /// database became reachable.
    #[error("could not connect to database: attempt limit ({0}) exceeded")]
    AttemptLimitExceeded(u32),

    /// The overall wait deadline elapsed before any probe succeeded.
    #[error("could not connect to database: timeout")]
    WaitTimeout,

    /// The connection factory itself did not complete within its fixed
    /// timeout.
    #[error("could not connect to database: timed out")]
    ConnectTimeout,

    /// The shared truncation deadline elapsed with results still outstanding.
    #[error("truncation timed out after {0:?}")]
    TruncateTimeout(Duration),

    /// An underlying driver error, propagated without interpretation.
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// The migration engine reported a failure.
    #[error("migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}
