//! Connection factory for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections from config.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have migrations fully applied.
//! - Testing environments trade durability for speed
//!   (`synchronous=OFF`, `journal_mode=TRUNCATE`).

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use crate::config::{DatabaseConfig, SQLITE_CLIENT};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-connection tuning derived from the runtime environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Enables the fast, non-durable pragmas used by test suites.
    pub testing: bool,
}

impl ConnectOptions {
    pub fn for_env(env: &str) -> Self {
        Self {
            testing: env.starts_with("testing"),
        }
    }
}

/// Opens the database described by `config` for environment `env`.
///
/// # Errors
/// - `DbError::UnsupportedClient` when the client is not `sqlite3`.
/// - Connection, pragma or migration failures.
pub fn connect(config: &DatabaseConfig, env: &str) -> DbResult<Connection> {
    if config.client != SQLITE_CLIENT {
        error!(
            "event=db_open module=db status=error error_code=unsupported_client client={}",
            config.client
        );
        return Err(DbError::UnsupportedClient(config.client.clone()));
    }

    let options = ConnectOptions::for_env(env);
    if config.is_in_memory() {
        open_db_in_memory_with(options)
    } else {
        open_db_with(&config.filename, options)
    }
}

/// Opens a SQLite database file with default options.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with(path, ConnectOptions::default())
}

/// Opens an in-memory SQLite database with default options.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_db_in_memory_with(ConnectOptions::default())
}

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Creates missing parent directories.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db_with(path: impl AsRef<Path>, options: ConnectOptions) -> DbResult<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        if let Err(err) = std::fs::create_dir_all(parent) {
            error!(
                "event=db_open module=db status=error mode=file error_code=db_dir_failed error={}",
                err
            );
        }
    }
    bootstrap("file", options, || Connection::open(path))
}

/// Opens an in-memory database and applies all pending migrations.
pub fn open_db_in_memory_with(options: ConnectOptions) -> DbResult<Connection> {
    bootstrap("memory", options, Connection::open_in_memory)
}

fn bootstrap(
    mode: &str,
    options: ConnectOptions,
    opener: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!(
        "event=db_open module=db status=start mode={} testing={}",
        mode, options.testing
    );

    let mut conn = opener().map_err(|err| {
        error!(
            "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
            mode,
            started_at.elapsed().as_millis(),
            err
        );
        DbError::from(err)
    })?;

    match configure_connection(&mut conn, options) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn configure_connection(conn: &mut Connection, options: ConnectOptions) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if options.testing {
        conn.execute_batch("PRAGMA synchronous = OFF;")?;
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "TRUNCATE", |row| row.get(0))?;
    }
    apply_migrations(conn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ConnectOptions;

    #[test]
    fn testing_options_follow_env_prefix() {
        assert!(ConnectOptions::for_env("testing").testing);
        assert!(ConnectOptions::for_env("testing-legacy").testing);
        assert!(!ConnectOptions::for_env("development").testing);
    }
}
