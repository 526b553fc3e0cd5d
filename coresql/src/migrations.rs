//! Migration engine contract and command-line dispatch.
//!
//! The crate contributes no migration execution logic of its own; it
//! delegates to an engine exposing up/down operations and wires that engine to
//! the positional-argument convention `<program> migrate up|down`.

use std::future::Future;
use std::process;

use sqlx::MySqlPool;
use sqlx::migrate::Migrator;
use thiserror::Error;
use tracing::{error, info};

use crate::error::{DbError, DbResult};

/// The migration capability consumed by [`handle_migration_args`].
pub trait Migrations {
    /// Applies all pending migrations.
    fn up(&self) -> impl Future<Output = DbResult<()>> + Send;

    /// Reverts all applied migrations.
    fn down(&self) -> impl Future<Output = DbResult<()>> + Send;
}

/// A [`Migrations`] engine backed by a [`sqlx::migrate::Migrator`].
///
/// Migrators are typically produced at compile time with [`sqlx::migrate!`]
/// and have static lifetime.
pub struct SqlxMigrations {
    migrator: &'static Migrator,
    pool: MySqlPool,
}

impl SqlxMigrations {
    /// Creates a new engine running `migrator` against `pool`.
    pub fn new(migrator: &'static Migrator, pool: MySqlPool) -> Self {
        Self { migrator, pool }
    }
}

impl Migrations for SqlxMigrations {
    async fn up(&self) -> DbResult<()> {
        info!("applying database migrations");
        self.migrator
            .run(&self.pool)
            .await
            .map_err(DbError::Migration)
    }

    async fn down(&self) -> DbResult<()> {
        info!("reverting database migrations");
        self.migrator
            .undo(&self.pool, 0)
            .await
            .map_err(DbError::Migration)
    }
}

/// A parsed migration command.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MigrationCommand {
    Up,
    Down,
}

/// Errors produced when migration arguments have an invalid shape.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("a command must be provided to 'migrate' (expected 'up' or 'down')")]
pub struct MigrationUsageError;

/// Parses positional arguments (program name excluded) into a migration
/// command.
///
/// Returns `Ok(None)` when the arguments are not a migration invocation at
/// all, so the surrounding program can handle them itself. Returns an error
/// when `migrate` is invoked with a missing or unrecognized subcommand.
pub fn parse_migration_args<I, S>(args: I) -> Result<Option<MigrationCommand>, MigrationUsageError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut args = args.into_iter();

    match args.next() {
        Some(arg) if arg.as_ref() == "migrate" => {}
        _ => return Ok(None),
    }

    let subcommand = args.next();
    match subcommand.as_ref().map(S::as_ref) {
        Some("up") => Ok(Some(MigrationCommand::Up)),
        Some("down") => Ok(Some(MigrationCommand::Down)),
        _ => Err(MigrationUsageError),
    }
}

/// Dispatches command-line arguments to the migration engine.
///
/// Invoke with the positional arguments following the program name, typically
/// `std::env::args().skip(1)`. The convention `<program> migrate up|down`
/// triggers the corresponding engine call; an invalid `migrate` invocation or
/// an engine failure is a fatal startup error and terminates the process.
/// Arguments that do not start with `migrate` are left untouched.
pub async fn handle_migration_args<M, I, S>(args: I, migrations: &M)
where
    M: Migrations,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let command = match parse_migration_args(args) {
        Ok(Some(command)) => command,
        Ok(None) => return,
        Err(err) => {
            error!(error = %err, "invalid migration arguments");
            process::exit(1);
        }
    };

    let result = match command {
        MigrationCommand::Up => migrations.up().await,
        MigrationCommand::Down => migrations.down().await,
    };

    if let Err(err) = result {
        error!(error = %err, "migration failed");
        process::exit(1);
    }
}

/// Applies all pending migrations and terminates the process on failure.
///
/// A fail-fast wrapper for program startup code.
pub async fn must_migrate_up<M: Migrations>(migrations: &M) {
    if let Err(err) = migrations.up().await {
        error!(error = %err, "migration failed");
        process::exit(1);
    }
}
