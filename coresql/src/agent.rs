//! Abstract SQL execution capability consumed by the waiter and the
//! truncator.

use std::future::Future;

use sqlx::{Connection, Executor, MySqlPool};

/// Statement used to discover the table names known to the current schema.
const SHOW_TABLES_STMT: &str = "SHOW TABLES";

/// The SQL execution capability this crate depends on.
///
/// An agent is a cheap, clonable handle (connection pools are `Arc`-backed)
/// that supports concurrent use from multiple tasks. Failures are surfaced as
/// opaque [`sqlx::Error`] values; this crate never interprets driver-specific
/// error codes.
pub trait SqlAgent: Clone + Send + Sync + 'static {
    /// Performs a single health-check probe against the database.
    fn ping(&self) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Returns the names of all tables known to the current schema.
    fn table_names(&self) -> impl Future<Output = Result<Vec<String>, sqlx::Error>> + Send;

    /// Executes a single statement, discarding any returned rows.
    fn execute(&self, statement: &str) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

impl SqlAgent for MySqlPool {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        let mut connection = self.acquire().await?;
        connection.ping().await
    }

    async fn table_names(&self) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(SHOW_TABLES_STMT)
            .fetch_all(self)
            .await
    }

    async fn execute(&self, statement: &str) -> Result<(), sqlx::Error> {
        Executor::execute(self, statement).await?;
        Ok(())
    }
}
