//! Bounded-concurrency table truncation for test isolation.
//!
//! One task is spawned per table and every statement runs fully in parallel
//! under a single shared deadline. Results flow back through a capacity-1
//! channel; the collector returns the first error observed, in arrival order,
//! and relies on the deadline to stop stragglers from delivering stale
//! results. A statement already submitted to the database cannot be aborted
//! at this layer, only the wait for it is abandoned.

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

use crate::agent::SqlAgent;
use crate::config::TruncateConfig;
use crate::error::{DbError, DbResult};

/// Bookkeeping tables owned by the migration engine, never truncated.
pub const RESERVED_TABLE_NAMES: [&str; 2] = ["schema_migrations", "schema_lock"];

/// Statements bracketing a batch so tables referenced by foreign keys can be
/// truncated in any order.
const DISABLE_FK_CHECKS_STMT: &str = "SET FOREIGN_KEY_CHECKS=0";
const ENABLE_FK_CHECKS_STMT: &str = "SET FOREIGN_KEY_CHECKS=1";

/// Formats a truncation statement for a single table identifier.
fn truncate_statement(table: &str) -> String {
    format!("TRUNCATE TABLE `{table}`")
}

/// Empties database tables during testing.
///
/// Callers must not depend on truncation order across tables; completion order
/// is whatever the driver delivers. Constraint checking is suspended for the
/// duration of a batch, since statements run in parallel with no
/// dependency-aware sequencing.
#[derive(Debug, Clone)]
pub struct Truncator<A> {
    agent: A,
    config: TruncateConfig,
}

impl<A> Truncator<A>
where
    A: SqlAgent,
{
    /// Creates a truncator with the default batch deadline.
    pub fn new(agent: A) -> Self {
        Self::with_config(agent, TruncateConfig::default())
    }

    /// Creates a truncator with an explicit configuration.
    pub fn with_config(agent: A, config: TruncateConfig) -> Self {
        Self { agent, config }
    }

    /// Empties every table in the database except the reserved bookkeeping
    /// tables.
    pub async fn truncate_all(&self) -> DbResult<()> {
        let deadline = Instant::now() + self.config.deadline();

        let tables = match time::timeout_at(deadline, self.agent.table_names()).await {
            Ok(tables) => tables?,
            Err(_) => return Err(DbError::TruncateTimeout(self.config.deadline())),
        };

        let tables: Vec<String> = tables
            .into_iter()
            .filter(|table| !RESERVED_TABLE_NAMES.contains(&table.as_str()))
            .collect();

        self.truncate_tables(tables).await
    }

    /// Removes all content in the given tables.
    ///
    /// Exactly one truncation statement is issued per name, all in parallel
    /// under the shared batch deadline, with foreign-key checking disabled
    /// around the batch. The first error observed aborts the batch and is
    /// returned verbatim; sibling statements already submitted to the
    /// database continue independently. An empty name set is a no-op and
    /// issues no statements at all.
    pub async fn truncate_tables<I, S>(&self, tables: I) -> DbResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tables: Vec<String> = tables
            .into_iter()
            .map(|table| table.as_ref().to_string())
            .collect();
        if tables.is_empty() {
            return Ok(());
        }

        let deadline = Instant::now() + self.config.deadline();

        // Tables may reference each other; constraint checking stays off
        // until the whole batch has settled.
        self.set_foreign_key_checks(false, deadline).await?;

        let batch_result = self.run_batch(&tables, deadline).await;

        // Re-enable even when the batch failed; the batch error still wins.
        let enable_result = self.set_foreign_key_checks(true, deadline).await;

        batch_result?;
        enable_result
    }

    /// Toggles foreign-key constraint checking under the batch deadline.
    async fn set_foreign_key_checks(&self, enabled: bool, deadline: Instant) -> DbResult<()> {
        let statement = if enabled {
            ENABLE_FK_CHECKS_STMT
        } else {
            DISABLE_FK_CHECKS_STMT
        };

        match time::timeout_at(deadline, self.agent.execute(statement)).await {
            Ok(result) => result.map_err(DbError::from),
            Err(_) => Err(DbError::TruncateTimeout(self.config.deadline())),
        }
    }

    /// Launches one truncation task per table and collects one result each.
    async fn run_batch(&self, tables: &[String], deadline: Instant) -> DbResult<()> {
        let (result_tx, mut result_rx) = mpsc::channel::<DbResult<()>>(1);

        for table in tables {
            let agent = self.agent.clone();
            let result_tx = result_tx.clone();
            let table = table.clone();

            tokio::spawn(async move {
                let statement = truncate_statement(&table);
                match time::timeout_at(deadline, agent.execute(&statement)).await {
                    Ok(result) => {
                        if let Err(err) = &result {
                            debug!(%table, error = %err, "truncation statement failed");
                        }
                        // Delivery is best-effort: if the collector stopped
                        // listening, the task exits instead of blocking.
                        tokio::select! {
                            _ = result_tx.send(result.map_err(DbError::from)) => {}
                            _ = time::sleep_until(deadline) => {}
                        }
                    }
                    Err(_) => {
                        // The batch deadline elapsed with the statement still
                        // running; the collector is timing out on its own.
                        debug!(%table, "truncation abandoned at deadline");
                    }
                }
            });
        }
        drop(result_tx);

        let timeout = time::sleep_until(deadline);
        tokio::pin!(timeout);

        // Exactly one result per launched task, in arrival order.
        let mut remaining = tables.len();
        while remaining > 0 {
            tokio::select! {
                _ = &mut timeout => {
                    warn!(outstanding = remaining, "truncation batch deadline elapsed");
                    return Err(DbError::TruncateTimeout(self.config.deadline()));
                }

                result = result_rx.recv() => match result {
                    Some(Ok(())) => remaining -= 1,
                    Some(Err(err)) => return Err(err),
                    // All tasks have gone away without reporting, which only
                    // happens when they abandoned delivery at the deadline.
                    None => return Err(DbError::TruncateTimeout(self.config.deadline())),
                },
            }
        }

        Ok(())
    }

    /// Runs [`Truncator::truncate_all`] and panics if it fails.
    ///
    /// # Panics
    /// Panics if discovery or any truncation statement fails.
    pub async fn must_truncate_all(&self) {
        if let Err(err) = self.truncate_all().await {
            panic!("failed to truncate all tables: {err}");
        }
    }

    /// Runs [`Truncator::truncate_tables`] and panics if it fails.
    ///
    /// # Panics
    /// Panics if any truncation statement fails.
    pub async fn must_truncate_tables<I, S>(&self, tables: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let Err(err) = self.truncate_tables(tables).await {
            panic!("failed to truncate tables: {err}");
        }
    }
}
