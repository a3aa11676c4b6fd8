//! Versioned schema for the agency database.
//!
//! Schema files are embedded with [`include_str!`]. The `schema_version`
//! table records every applied version, and [`run_migrations`] applies only
//! the versions above its maximum, all in one transaction.

use rusqlite::{Connection, params};
use tracing::info;

use crate::errors::{Result, StoreError};

/// `(version, description, sql)`, ascending by version.
const SCHEMA: [(u32, &str, &str); 1] = [(
    1,
    "catalog, memberships, tickets, comments, audit log",
    include_str!("v001_schema.sql"),
)];

const VERSION_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TEXT    NOT NULL,
    description TEXT
);";

/// Bring the schema up to date. Returns how many versions were applied.
pub fn run_migrations(conn: &Connection) -> Result<u32> {
    let tx = conn.unchecked_transaction().map_err(failed("begin"))?;
    tx.execute_batch(VERSION_TABLE)
        .map_err(failed("create schema_version"))?;

    let current = current_version(&tx)?;
    let mut applied = 0;
    for &(version, description, sql) in SCHEMA.iter().filter(|(v, ..)| *v > current) {
        info!(version, description, "applying migration");
        tx.execute_batch(sql).map_err(|e| StoreError::Migration {
            message: format!("v{version} ({description}): {e}"),
        })?;
        let _ = tx
            .execute(
                "INSERT INTO schema_version (version, applied_at, description) \
                 VALUES (?1, datetime('now'), ?2)",
                params![version, description],
            )
            .map_err(failed("record version"))?;
        applied += 1;
    }

    tx.commit().map_err(failed("commit"))?;
    Ok(applied)
}

/// Highest applied version, or 0 on a fresh database.
pub fn current_version(conn: &Connection) -> Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(failed("read schema_version"))
}

/// Latest version shipped with this build.
pub fn latest_version() -> u32 {
    SCHEMA.last().map_or(0, |&(version, ..)| version)
}

fn failed(step: &'static str) -> impl Fn(rusqlite::Error) -> StoreError {
    move |e| StoreError::Migration {
        message: format!("{step}: {e}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
