//! In-memory [`SqlAgent`] double with scripted failure modes.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::agent::SqlAgent;

/// An in-memory agent holding named tables with row counts.
///
/// Pings and per-table truncations can be scripted to fail or hang, and every
/// executed statement is recorded for assertions. Cloning shares the same
/// underlying state, mirroring how pooled handles behave.
#[derive(Debug, Clone)]
pub struct MemoryAgent {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    /// Table name to row count.
    tables: Mutex<BTreeMap<String, u64>>,
    /// Every statement passed to [`SqlAgent::execute`], in call order.
    executed: Mutex<Vec<String>>,
    /// Number of pings received so far.
    pings: AtomicU32,
    /// Number of leading pings that fail before pings start succeeding.
    ping_failures: AtomicU32,
    /// When set, pings never resolve.
    hang_pings: AtomicBool,
    /// Delay applied to every ping before it succeeds.
    ping_delay: Mutex<Option<Duration>>,
    /// Tables whose truncation statements never resolve.
    hanging_tables: Mutex<HashSet<String>>,
}

impl MemoryAgent {
    /// Creates an empty agent that answers every operation successfully.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: Mutex::new(BTreeMap::new()),
                executed: Mutex::new(Vec::new()),
                pings: AtomicU32::new(0),
                ping_failures: AtomicU32::new(0),
                hang_pings: AtomicBool::new(false),
                ping_delay: Mutex::new(None),
                hanging_tables: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Adds a table with the given row count.
    pub fn with_table(self, name: &str, rows: u64) -> Self {
        self.inner
            .tables
            .lock()
            .unwrap()
            .insert(name.to_string(), rows);
        self
    }

    /// Makes the first `count` pings fail with a connection error.
    pub fn failing_pings(self, count: u32) -> Self {
        self.inner.ping_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Makes every ping hang forever.
    pub fn hanging_pings(self) -> Self {
        self.inner.hang_pings.store(true, Ordering::SeqCst);
        self
    }

    /// Makes every ping succeed only after the given delay.
    pub fn ping_delay(self, delay: Duration) -> Self {
        *self.inner.ping_delay.lock().unwrap() = Some(delay);
        self
    }

    /// Makes truncation statements against `name` hang forever.
    pub fn hanging_table(self, name: &str) -> Self {
        self.inner
            .hanging_tables
            .lock()
            .unwrap()
            .insert(name.to_string());
        self
    }

    /// Returns the number of pings received.
    pub fn ping_count(&self) -> u32 {
        self.inner.pings.load(Ordering::SeqCst)
    }

    /// Returns every executed statement, in call order.
    pub fn executed(&self) -> Vec<String> {
        self.inner.executed.lock().unwrap().clone()
    }

    /// Returns the row count of a table, or `None` if it does not exist.
    pub fn row_count(&self, name: &str) -> Option<u64> {
        self.inner.tables.lock().unwrap().get(name).copied()
    }
}

impl Default for MemoryAgent {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts the target table from a truncation statement.
fn truncate_target(statement: &str) -> Option<&str> {
    statement
        .strip_prefix("TRUNCATE TABLE `")?
        .strip_suffix('`')
}

impl SqlAgent for MemoryAgent {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        let attempt = self.inner.pings.fetch_add(1, Ordering::SeqCst);

        if self.inner.hang_pings.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let delay = *self.inner.ping_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if attempt < self.inner.ping_failures.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }

        Ok(())
    }

    async fn table_names(&self) -> Result<Vec<String>, sqlx::Error> {
        Ok(self.inner.tables.lock().unwrap().keys().cloned().collect())
    }

    async fn execute(&self, statement: &str) -> Result<(), sqlx::Error> {
        self.inner
            .executed
            .lock()
            .unwrap()
            .push(statement.to_string());

        let Some(table) = truncate_target(statement) else {
            return Ok(());
        };

        let hanging = self.inner.hanging_tables.lock().unwrap().contains(table);
        if hanging {
            std::future::pending::<()>().await;
        }

        match self.inner.tables.lock().unwrap().get_mut(table) {
            Some(rows) => {
                *rows = 0;
                Ok(())
            }
            None => Err(sqlx::Error::Protocol(format!(
                "table `{table}` does not exist"
            ))),
        }
    }
}
