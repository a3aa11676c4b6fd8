//! `r2d2` pool over `SQLite` with per-connection pragmas.
//!
//! Every connection handed out by the pool runs the same pragma batch on
//! acquire: WAL journaling, a busy timeout, foreign keys, and the page cache
//! size from [`ConnectionConfig`].

use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use serde::Serialize;

use crate::errors::Result;

/// Alias for the connection pool type.
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Alias for a pooled connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pool sizing and per-connection tuning.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Maximum pool size (default: 8).
    pub pool_size: u32,
    /// Busy timeout in milliseconds (default: 30000).
    pub busy_timeout_ms: u32,
    /// Cache size in KiB (default: 4096).
    pub cache_size_kib: i64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            pool_size: 8,
            busy_timeout_ms: 30_000,
            cache_size_kib: 4096,
        }
    }
}

impl ConnectionConfig {
    fn pragma_batch(&self) -> String {
        format!(
            "PRAGMA journal_mode = WAL;\
             PRAGMA busy_timeout = {};\
             PRAGMA foreign_keys = ON;\
             PRAGMA cache_size = -{};\
             PRAGMA synchronous = NORMAL;",
            self.busy_timeout_ms, self.cache_size_kib
        )
    }
}

#[derive(Debug)]
struct Pragmas(String);

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for Pragmas {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&self.0)
    }
}

/// Build a pool for `path`, or a private in-memory database when `path` is
/// `None`.
///
/// In-memory connections do not share data, so callers that need one
/// consistent view use a pool size of 1.
pub fn open_pool(path: Option<&Path>, config: &ConnectionConfig) -> Result<ConnectionPool> {
    let manager = path.map_or_else(SqliteConnectionManager::memory, SqliteConnectionManager::file);
    Ok(Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(Duration::from_secs(5))
        .connection_customizer(Box::new(Pragmas(config.pragma_batch())))
        .build(manager)?)
}

/// Effective pragmas on a connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PragmaState {
    /// `wal` for files, `memory` for in-memory databases.
    pub journal_mode: String,
    /// Whether foreign key constraints are enforced.
    pub foreign_keys: bool,
}

/// Read back the pragmas the pool applied.
pub fn verify_pragmas(conn: &Connection) -> Result<PragmaState> {
    let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
    let foreign_keys: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
    Ok(PragmaState {
        journal_mode,
        foreign_keys: foreign_keys == 1,
    })
}
