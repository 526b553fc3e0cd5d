//! Connection factory and the [`Database`] handle.

use std::time::Duration;

use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tokio::time;
use tracing::{error, info};

use crate::agent::SqlAgent;
use crate::config::{MySqlConnectionConfig, WaitConfig};
use crate::error::{DbError, DbResult};
use crate::wait::wait_for_connection;

/// Fixed timeout for the connection factory itself.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Healthy status line reported by [`Database::check`].
const CHECK_OK_MESSAGE: &str = "database connection ok";

/// A database handle wrapping a [`MySqlPool`] with readiness helpers.
///
/// The pool is shared read-only: cloning it is cheap and concurrent calls on
/// the same handle are safe, with connection-per-operation pooling delegated
/// to the driver.
#[derive(Debug, Clone)]
pub struct Database {
    pool: MySqlPool,
    wait_config: WaitConfig,
}

impl Database {
    /// Opens a database connection pool, verifying one connection eagerly.
    ///
    /// The whole factory call is bounded by a fixed 5 second timeout; on
    /// expiry a distinguished [`DbError::ConnectTimeout`] is returned instead
    /// of hanging indefinitely.
    pub async fn connect(config: &MySqlConnectionConfig) -> DbResult<Self> {
        Self::connect_with(config, WaitConfig::default()).await
    }

    /// Same as [`Database::connect`] with an explicit wait configuration for
    /// later [`Database::wait`] calls.
    pub async fn connect_with(
        config: &MySqlConnectionConfig,
        wait_config: WaitConfig,
    ) -> DbResult<Self> {
        let options = config.with_db();

        let pool = match time::timeout(
            CONNECT_TIMEOUT,
            MySqlPoolOptions::new().connect_with(options),
        )
        .await
        {
            Ok(pool) => pool?,
            Err(_) => return Err(DbError::ConnectTimeout),
        };

        info!(host = %config.host, database = %config.name, "connected to database");

        Ok(Self { pool, wait_config })
    }

    /// Opens a database connection pool without touching the network.
    ///
    /// Connections are established on first use. Pair this with
    /// [`Database::wait`] when the database may not be reachable yet, as in
    /// containerized startup races.
    pub fn connect_lazy(config: &MySqlConnectionConfig) -> Self {
        Self::connect_lazy_with(config, WaitConfig::default())
    }

    /// Same as [`Database::connect_lazy`] with an explicit wait configuration.
    pub fn connect_lazy_with(config: &MySqlConnectionConfig, wait_config: WaitConfig) -> Self {
        let pool = MySqlPoolOptions::new().connect_lazy_with(config.with_db());

        Self { pool, wait_config }
    }

    /// Opens a database connection pool and terminates the process if it
    /// cannot be opened.
    ///
    /// A fail-fast wrapper for program startup code.
    pub async fn must_connect(config: &MySqlConnectionConfig) -> Self {
        match Self::connect(config).await {
            Ok(database) => database,
            Err(err) => {
                error!(error = %err, "could not open database connection");
                std::process::exit(1);
            }
        }
    }

    /// Returns the underlying connection pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Blocks until the database answers a ping, the attempt limit is
    /// exhausted, or the wait deadline elapses.
    pub async fn wait(&self) -> DbResult<()> {
        wait_for_connection(&self.pool, &self.wait_config).await
    }

    /// Calls [`Database::wait`] and terminates the process if the database
    /// never became reachable.
    ///
    /// A fail-fast wrapper for program startup code.
    pub async fn must_wait(&self) {
        if let Err(err) = self.wait().await {
            error!(error = %err, "database did not become ready");
            std::process::exit(1);
        }
    }

    /// Reports whether the database connection is still alive.
    ///
    /// Returns diagnostic lines and an overall ok flag, in the shape health
    /// endpoints expect.
    pub async fn check(&self) -> (Vec<String>, bool) {
        match SqlAgent::ping(&self.pool).await {
            Ok(()) => (vec![CHECK_OK_MESSAGE.to_string()], true),
            Err(err) => (vec![err.to_string()], false),
        }
    }
}
