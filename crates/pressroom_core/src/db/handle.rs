//! Shared database handle.
//!
//! One connection per site, owned here and lent out to repositories for the
//! duration of a closure. Services hold `Arc<Database>`.

use super::open::connect;
use super::DbResult;
use crate::config::DatabaseConfig;
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Opens and migrates the configured database.
    pub fn connect(config: &DatabaseConfig, env: &str) -> DbResult<Self> {
        connect(config, env).map(Self::new)
    }

    /// Runs `f` with exclusive access to the connection.
    ///
    /// Do not publish events from inside `f`: subscribers may need the
    /// connection themselves.
    pub fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> T) -> T {
        let mut guard = self.lock();
        f(&mut guard)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves SQLite itself consistent.
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
