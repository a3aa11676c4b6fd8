use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::connection::{
    self, ConnectionConfig, ConnectionPool, PooledConnection, PragmaState,
};
use crate::errors::Result;
use crate::migrations;

/// Migrated, pooled handle to the agency database.
///
/// Cloning is cheap and shares the underlying pool.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
    path: PathBuf,
}

impl Database {
    /// Open or create a database at the given path and apply migrations.
    pub fn open(path: &Path, config: &ConnectionConfig) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let pool = connection::open_pool(Some(path), config)?;
        let conn = pool.get()?;
        let applied = migrations::run_migrations(&conn)?;
        let pragmas = connection::verify_pragmas(&conn)?;
        drop(conn);

        if pragmas.journal_mode != "wal" || !pragmas.foreign_keys {
            warn!(
                path = %path.display(),
                journal_mode = %pragmas.journal_mode,
                foreign_keys = pragmas.foreign_keys,
                "database pragmas not applied as configured"
            );
        }
        info!(
            path = %path.display(),
            applied,
            journal_mode = %pragmas.journal_mode,
            "database opened"
        );

        Ok(Self {
            pool,
            path: path.to_owned(),
        })
    }

    /// Open a migrated in-memory database.
    ///
    /// The pool holds a single connection so every caller sees the same data.
    pub fn in_memory() -> Result<Self> {
        let config = ConnectionConfig {
            pool_size: 1,
            ..ConnectionConfig::default()
        };
        let pool = connection::open_pool(None, &config)?;
        let _ = migrations::run_migrations(&*pool.get()?)?;

        Ok(Self {
            pool,
            path: PathBuf::from(":memory:"),
        })
    }

    /// Check out a pooled connection.
    pub fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    /// Pragmas in effect on a pooled connection.
    pub fn pragmas(&self) -> Result<PragmaState> {
        connection::verify_pragmas(&*self.conn()?)
    }

    /// Location the database was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Highest applied schema version.
    pub fn schema_version(&self) -> Result<u32> {
        migrations::current_version(&*self.conn()?)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("max_size", &self.pool.max_size())
            .finish_non_exhaustive()
    }
}
