//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema and data migrations in strictly increasing order.
//! - Apply pending migrations atomically, optionally up to a target version.
//! - Roll migrations back through their `down` scripts.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - A migration run is one transaction: it lands completely or not at all.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, Transaction};

pub mod dedupe;

type DataMigration = fn(&Transaction<'_>) -> DbResult<()>;

#[derive(Clone, Copy)]
enum MigrationStep {
    Sql(&'static str),
    Data(DataMigration),
}

#[derive(Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    up: MigrationStep,
    /// `None` means the migration has no reverse (data repairs).
    down: Option<&'static str>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "settings",
        up: MigrationStep::Sql(include_str!("0001_settings.sql")),
        down: Some(include_str!("0001_settings.down.sql")),
    },
    Migration {
        version: 2,
        name: "members",
        up: MigrationStep::Sql(include_str!("0002_members.sql")),
        down: Some(include_str!("0002_members.down.sql")),
    },
    Migration {
        version: 3,
        name: "remove-duplicate-subscriptions",
        up: MigrationStep::Data(remove_duplicate_subscriptions),
        down: None,
    },
    Migration {
        version: 4,
        name: "remove-duplicate-customers",
        up: MigrationStep::Data(remove_duplicate_customers),
        down: None,
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Returns the schema version recorded in the database.
pub fn current_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    apply_migrations_to(conn, latest_version())
}

/// Applies pending migrations up to and including `target`.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the database is newer than this binary.
/// - `InvalidMigrationTarget` when `target` is unknown or below the current
///   version (use [`rollback_migrations_to`] for that).
pub fn apply_migrations_to(conn: &mut Connection, target: u32) -> DbResult<()> {
    let current = current_version(conn)?;
    let latest = latest_version();

    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }
    if target > latest || target < current {
        return Err(DbError::InvalidMigrationTarget {
            target,
            current,
            latest,
        });
    }
    if current == target {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current && migration.version <= target)
    {
        match migration.up {
            MigrationStep::Sql(sql) => tx.execute_batch(sql)?,
            MigrationStep::Data(run) => run(&tx)?,
        }
        set_user_version(&tx, migration.version)?;
        info!(
            "event=migration_apply module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    Ok(())
}

/// Reverts applied migrations until the schema is at `target`.
///
/// Migrations without a `down` script are skipped but still unrecorded.
pub fn rollback_migrations_to(conn: &mut Connection, target: u32) -> DbResult<()> {
    let current = current_version(conn)?;
    let latest = latest_version();

    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }
    if target > current {
        return Err(DbError::InvalidMigrationTarget {
            target,
            current,
            latest,
        });
    }
    if target == current {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS
        .iter()
        .rev()
        .filter(|migration| migration.version > target && migration.version <= current)
    {
        match migration.down {
            Some(sql) => tx.execute_batch(sql)?,
            None => info!(
                "event=migration_rollback module=db status=skipped version={} name={} reason=noop_down",
                migration.version, migration.name
            ),
        }
        set_user_version(&tx, migration.version - 1)?;
        info!(
            "event=migration_rollback module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    Ok(())
}

fn set_user_version(conn: &Connection, version: u32) -> DbResult<()> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))?;
    Ok(())
}

fn remove_duplicate_subscriptions(tx: &Transaction<'_>) -> DbResult<()> {
    dedupe::remove_duplicate_rows(tx, &dedupe::STRIPE_SUBSCRIPTIONS).map(|_| ())
}

fn remove_duplicate_customers(tx: &Transaction<'_>) -> DbResult<()> {
    dedupe::remove_duplicate_rows(tx, &dedupe::STRIPE_CUSTOMERS).map(|_| ())
}
