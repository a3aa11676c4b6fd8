//! # agency-store
//!
//! SQLite persistence for the agency engine.
//!
//! - [`Database`]: migrated `r2d2` pool; file-backed in production, single
//!   connection in-memory for tests
//! - [`migrations`]: versioned schema embedded at compile time
//! - [`audit`]: the append-only audit log shared by tickets and catalog entities
//! - [`row_helpers`]: typed column access reporting [`StoreError::CorruptRow`]
//!
//! Repositories in downstream crates are stateless and take `&Connection`, so
//! they work equally on a pooled connection or inside a transaction.

#![deny(unsafe_code)]

pub mod audit;
pub mod connection;
mod database;
pub mod errors;
pub mod migrations;
pub mod row_helpers;

pub use audit::{AuditAction, AuditEntry, AuditRepo, AuditSubject, LogOrder, NewAuditEntry};
pub use connection::{ConnectionConfig, ConnectionPool, PooledConnection, PragmaState};
pub use database::Database;
pub use errors::{Result, StoreError};
