//! Duplicate-row repair for tables keyed by a non-unique external id.
//!
//! # Responsibility
//! - Find groups of rows sharing one external id (Stripe customer or
//!   subscription id).
//! - Keep the most recently updated row of each group and delete the rest.
//!
//! # Invariants
//! - Exactly one row survives per external id.
//! - The survivor has the maximum `updated_at`; ties keep the greatest `id`.
//! - Table and column names come only from the static targets below.

use crate::db::DbResult;
use log::{info, warn};
use rusqlite::{params, Connection};

/// A table whose rows should be unique per `external_id_column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupeTarget {
    pub table: &'static str,
    pub external_id_column: &'static str,
    /// Human-readable row noun for log lines.
    pub label: &'static str,
}

pub const STRIPE_SUBSCRIPTIONS: DedupeTarget = DedupeTarget {
    table: "members_stripe_customers_subscriptions",
    external_id_column: "subscription_id",
    label: "subscription",
};

pub const STRIPE_CUSTOMERS: DedupeTarget = DedupeTarget {
    table: "members_stripe_customers",
    external_id_column: "customer_id",
    label: "customer",
};

/// Outcome of one repair pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupeReport {
    /// Number of external ids that had more than one row.
    pub duplicate_groups: usize,
    /// Surviving row ids, one per duplicate group.
    pub kept_ids: Vec<String>,
    /// Deleted row ids.
    pub deleted_ids: Vec<String>,
}

#[derive(Debug)]
struct CandidateRow {
    id: String,
    external_id: String,
    updated_at: i64,
}

/// Removes all but the newest row for every duplicated external id.
///
/// Callers are expected to run this inside a transaction.
pub fn remove_duplicate_rows(conn: &Connection, target: &DedupeTarget) -> DbResult<DedupeReport> {
    let duplicates = find_duplicate_ids(conn, target)?;
    let mut report = DedupeReport::default();

    if duplicates.is_empty() {
        info!(
            "event=dedupe module=db status=ok table={} duplicates=0 message=\"No duplicate {}s found\"",
            target.table, target.label
        );
        return Ok(report);
    }

    info!(
        "event=dedupe module=db status=start table={} duplicates={} message=\"Found {} duplicate stripe {}s\"",
        target.table,
        duplicates.len(),
        duplicates.len(),
        target.label
    );
    report.duplicate_groups = duplicates.len();

    for external_id in duplicates {
        let mut rows = load_group(conn, target, &external_id)?;
        rows.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let mut rows = rows.into_iter();
        let Some(newest) = rows.next() else {
            warn!(
                "event=dedupe module=db status=skipped table={} external_id={} reason=group_vanished",
                target.table, external_id
            );
            continue;
        };
        info!(
            "event=dedupe module=db status=keep table={} id={} external_id={} updated_at={}",
            target.table, newest.id, newest.external_id, newest.updated_at
        );

        for older in rows {
            info!(
                "event=dedupe module=db status=delete table={} id={} external_id={} updated_at={}",
                target.table, older.id, older.external_id, older.updated_at
            );
            conn.execute(
                &format!("DELETE FROM {} WHERE id = ?1;", target.table),
                params![older.id],
            )?;
            report.deleted_ids.push(older.id);
        }
        report.kept_ids.push(newest.id);
    }

    Ok(report)
}

fn find_duplicate_ids(conn: &Connection, target: &DedupeTarget) -> DbResult<Vec<String>> {
    let column = target.external_id_column;
    let mut stmt = conn.prepare(&format!(
        "SELECT {column}, COUNT({column}) AS count
         FROM {table}
         GROUP BY {column}
         HAVING count > 1
         ORDER BY {column} ASC;",
        table = target.table
    ))?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn load_group(
    conn: &Connection,
    target: &DedupeTarget,
    external_id: &str,
) -> DbResult<Vec<CandidateRow>> {
    let column = target.external_id_column;
    let mut stmt = conn.prepare(&format!(
        "SELECT id, {column}, updated_at
         FROM {table}
         WHERE {column} = ?1;",
        table = target.table
    ))?;
    let rows = stmt
        .query_map([external_id], |row| {
            Ok(CandidateRow {
                id: row.get(0)?,
                external_id: row.get(1)?,
                updated_at: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
