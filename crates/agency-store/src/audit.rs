//! Append-only audit log shared by tickets and catalog entities.
//!
//! Every mutating operation in the ticket and schedule services appends exactly
//! one [`AuditEntry`] inside the same transaction as the change it describes.
//! Rows are never updated; they disappear only when their subject is deleted
//! (enforced by triggers in the schema).

use std::fmt;
use std::str::FromStr;

use agency_core::{Caller, UserId};
use chrono::NaiveDateTime;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::row_helpers::{get, get_opt, parse_enum};

/// Kind of record an audit entry describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSubject {
    /// A ticket.
    Ticket,
    /// A project commitment source.
    Project,
    /// An activity commitment source.
    Activity,
}

impl AuditSubject {
    /// Stored representation.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Ticket => "ticket",
            Self::Project => "project",
            Self::Activity => "activity",
        }
    }
}

impl fmt::Display for AuditSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for AuditSubject {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ticket" => Ok(Self::Ticket),
            "project" => Ok(Self::Project),
            "activity" => Ok(Self::Activity),
            other => Err(format!("unknown audit subject: {other}")),
        }
    }
}

/// What happened to the subject.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Subject was created.
    Created,
    /// One or more fields (or the status) changed.
    Updated,
    /// Assignee changed.
    Assigned,
    /// A comment was added.
    Commented,
    /// Scheduled time range changed.
    Rescheduled,
}

impl AuditAction {
    /// Stored representation.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Assigned => "assigned",
            Self::Commented => "commented",
            Self::Rescheduled => "rescheduled",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for AuditAction {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "assigned" => Ok(Self::Assigned),
            "commented" => Ok(Self::Commented),
            "rescheduled" => Ok(Self::Rescheduled),
            other => Err(format!("unknown audit action: {other}")),
        }
    }
}

/// Display order for an audit trail.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogOrder {
    /// Most recent first (display).
    #[default]
    NewestFirst,
    /// Oldest first (replay).
    OldestFirst,
}

impl FromStr for LogOrder {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newest" | "newest_first" | "desc" => Ok(Self::NewestFirst),
            "oldest" | "oldest_first" | "asc" => Ok(Self::OldestFirst),
            other => Err(format!("unknown log order: {other}")),
        }
    }
}

/// A persisted audit row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Row id; increases with insertion order.
    pub id: i64,
    /// Kind of record described.
    pub subject: AuditSubject,
    /// Id of the described record.
    pub subject_id: i64,
    /// Acting user.
    pub operator_id: UserId,
    /// Acting user's display name at the time.
    pub operator_name: String,
    /// What happened.
    pub action: AuditAction,
    /// Changed field name(s), comma-joined.
    pub field_changed: Option<String>,
    /// Value before the change.
    pub old_value: Option<String>,
    /// Value after the change.
    pub new_value: Option<String>,
    /// When the entry was written.
    pub created_at: NaiveDateTime,
}

/// An audit row about to be appended.
#[derive(Clone, Debug)]
pub struct NewAuditEntry {
    /// Kind of record described.
    pub subject: AuditSubject,
    /// Id of the described record.
    pub subject_id: i64,
    /// Acting user.
    pub operator_id: UserId,
    /// Acting user's display name.
    pub operator_name: String,
    /// What happened.
    pub action: AuditAction,
    /// Changed field name(s).
    pub field_changed: Option<String>,
    /// Value before the change.
    pub old_value: Option<String>,
    /// Value after the change.
    pub new_value: Option<String>,
    /// Timestamp to record.
    pub created_at: NaiveDateTime,
}

impl NewAuditEntry {
    /// Entry with no field-level detail, attributed to `caller`.
    pub fn new(
        subject: AuditSubject,
        subject_id: i64,
        caller: &Caller,
        action: AuditAction,
        at: NaiveDateTime,
    ) -> Self {
        Self {
            subject,
            subject_id,
            operator_id: caller.user_id,
            operator_name: caller.operator_name().to_string(),
            action,
            field_changed: None,
            old_value: None,
            new_value: None,
            created_at: at,
        }
    }

    /// Attach field-level detail.
    #[must_use]
    pub fn with_change(
        mut self,
        field: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        self.field_changed = Some(field.into());
        self.old_value = old_value;
        self.new_value = new_value;
        self
    }
}

/// Stateless audit log repository.
pub struct AuditRepo;

impl AuditRepo {
    /// Append one entry and return it with its assigned id.
    pub fn append(conn: &Connection, entry: &NewAuditEntry) -> Result<AuditEntry> {
        let _ = conn.execute(
            "INSERT INTO audit_log (subject_kind, subject_id, operator_id, operator_name, action, \
             field_changed, old_value, new_value, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.subject.as_sql(),
                entry.subject_id,
                entry.operator_id.get(),
                entry.operator_name,
                entry.action.as_sql(),
                entry.field_changed,
                entry.old_value,
                entry.new_value,
                entry.created_at,
            ],
        )?;

        Ok(AuditEntry {
            id: conn.last_insert_rowid(),
            subject: entry.subject,
            subject_id: entry.subject_id,
            operator_id: entry.operator_id,
            operator_name: entry.operator_name.clone(),
            action: entry.action,
            field_changed: entry.field_changed.clone(),
            old_value: entry.old_value.clone(),
            new_value: entry.new_value.clone(),
            created_at: entry.created_at,
        })
    }

    /// All entries for one subject, ordered by time with id as tiebreak.
    pub fn list(
        conn: &Connection,
        subject: AuditSubject,
        subject_id: i64,
        order: LogOrder,
    ) -> Result<Vec<AuditEntry>> {
        let direction = match order {
            LogOrder::NewestFirst => "DESC",
            LogOrder::OldestFirst => "ASC",
        };
        let sql = format!(
            "SELECT id, subject_kind, subject_id, operator_id, operator_name, action, \
             field_changed, old_value, new_value, created_at \
             FROM audit_log WHERE subject_kind = ?1 AND subject_id = ?2 \
             ORDER BY created_at {direction}, id {direction}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![subject.as_sql(), subject_id])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(entry_from_row(row)?);
        }
        Ok(entries)
    }

    /// Number of entries recorded for one subject.
    pub fn count(conn: &Connection, subject: AuditSubject, subject_id: i64) -> Result<u64> {
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM audit_log WHERE subject_kind = ?1 AND subject_id = ?2",
            params![subject.as_sql(), subject_id],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(n).unwrap_or_default())
    }
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> Result<AuditEntry> {
    const T: &str = "audit_log";
    let subject: String = get(row, 1, T, "subject_kind")?;
    let action: String = get(row, 5, T, "action")?;
    Ok(AuditEntry {
        id: get(row, 0, T, "id")?,
        subject: parse_enum(&subject, T, "subject_kind")?,
        subject_id: get(row, 2, T, "subject_id")?,
        operator_id: UserId::new(get(row, 3, T, "operator_id")?),
        operator_name: get(row, 4, T, "operator_name")?,
        action: parse_enum(&action, T, "action")?,
        field_changed: get_opt(row, 6, T, "field_changed")?,
        old_value: get_opt(row, 7, T, "old_value")?,
        new_value: get_opt(row, 8, T, "new_value")?,
        created_at: get(row, 9, T, "created_at")?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
