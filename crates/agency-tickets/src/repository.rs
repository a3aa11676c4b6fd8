//! Ticket and comment persistence.
//!
//! Stateless: every function takes the connection (or transaction) to run on.

use std::collections::BTreeMap;

use agency_core::{ArtistId, Caller, TicketId, UserId};
use agency_store::row_helpers::{get, get_opt, parse_enum};
use chrono::{NaiveDateTime, NaiveTime};
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::types::{
    Comment, NewComment, Priority, Ticket, TicketFilter, TicketStats, TicketStatus,
    normalize_ticket_type, ticket_type_labels,
};

const TICKET_COLUMNS: &str = "id, ticket_no, artist_id, title, description, ticket_type, \
    priority, status, creator_id, assigned_to, due_date, completed_at, attachment_path, \
    created_at, updated_at";

/// Stateless ticket repository.
pub struct TicketRepo;

impl TicketRepo {
    /// Insert a fully resolved ticket. `ticket.id` is ignored.
    pub fn insert(conn: &Connection, ticket: &Ticket) -> Result<TicketId> {
        let _ = conn.execute(
            "INSERT INTO tickets (ticket_no, artist_id, title, description, ticket_type, \
             priority, status, creator_id, assigned_to, due_date, completed_at, \
             attachment_path, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                ticket.ticket_no,
                ticket.artist_id.map(ArtistId::get),
                ticket.title,
                ticket.description,
                ticket.ticket_type,
                ticket.priority.as_str(),
                ticket.status.as_str(),
                ticket.creator_id.get(),
                ticket.assigned_to,
                ticket.due_date,
                ticket.completed_at,
                ticket.attachment_path,
                ticket.created_at,
                ticket.updated_at,
            ],
        )?;
        Ok(TicketId::new(conn.last_insert_rowid()))
    }

    /// Load one ticket.
    pub fn get(conn: &Connection, id: TicketId) -> Result<Option<Ticket>> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1");
        let ticket = conn
            .query_row(&sql, params![id.get()], |row| Ok(ticket_from_row(row)))
            .optional()?
            .transpose()?;
        Ok(ticket)
    }

    /// Overwrite every mutable column. `ticket_no`, `creator_id`, and
    /// `created_at` are never rewritten.
    pub fn save(conn: &Connection, ticket: &Ticket) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE tickets SET artist_id = ?1, title = ?2, description = ?3, ticket_type = ?4, \
             priority = ?5, status = ?6, assigned_to = ?7, due_date = ?8, completed_at = ?9, \
             attachment_path = ?10, updated_at = ?11 WHERE id = ?12",
            params![
                ticket.artist_id.map(ArtistId::get),
                ticket.title,
                ticket.description,
                ticket.ticket_type,
                ticket.priority.as_str(),
                ticket.status.as_str(),
                ticket.assigned_to,
                ticket.due_date,
                ticket.completed_at,
                ticket.attachment_path,
                ticket.updated_at,
                ticket.id.get(),
            ],
        )?;
        Ok(changed > 0)
    }

    /// List tickets matching `filter`, newest first.
    ///
    /// With `scope` set to a non-admin caller, only tickets the caller
    /// created or is assigned are considered.
    pub fn list(
        conn: &Connection,
        filter: &TicketFilter,
        scope: Option<&Caller>,
    ) -> Result<Vec<Ticket>> {
        let (mut conditions, mut values) = scope_clause(scope);

        if let Some(artist) = filter.artist_id {
            conditions.push("artist_id = ?".to_string());
            values.push(Box::new(artist.get()));
        }
        if let Some(ref ticket_type) = filter.ticket_type {
            let normalized = normalize_ticket_type(ticket_type)?;
            let labels = ticket_type_labels(&normalized);
            push_any_of(&mut conditions, &mut values, "ticket_type", &labels);
        }
        if let Some(status) = filter.status {
            push_any_of(&mut conditions, &mut values, "status", status.labels());
        }
        if let Some(priority) = filter.priority {
            push_any_of(&mut conditions, &mut values, "priority", priority.labels());
        }
        if let Some(ref assignee) = filter.assigned_to {
            conditions.push("assigned_to = ?".to_string());
            values.push(Box::new(assignee.clone()));
        }
        if let Some(from) = filter.created_from {
            conditions.push("created_at >= ?".to_string());
            values.push(Box::new(from.and_time(NaiveTime::MIN)));
        }
        if let Some(to) = filter.created_to {
            conditions.push("created_at <= ?".to_string());
            values.push(Box::new(end_of_day(to)));
        }

        let mut sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets {} ORDER BY created_at DESC, id DESC",
            where_clause(&conditions)
        );
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            values.push(Box::new(limit));
        }

        let params: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(AsRef::as_ref).collect();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params.as_slice())?;
        let mut tickets = Vec::new();
        while let Some(row) = rows.next()? {
            tickets.push(ticket_from_row(row)?);
        }
        Ok(tickets)
    }

    /// Counts by status, type, and priority. `assignee` limits the set to
    /// tickets assigned to that nickname.
    pub fn stats(conn: &Connection, assignee: Option<&str>) -> Result<TicketStats> {
        let mut values: Vec<&dyn rusqlite::types::ToSql> = Vec::new();
        let condition = match assignee.as_ref() {
            Some(name) => {
                values.push(name);
                "WHERE assigned_to = ?1"
            }
            None => "",
        };

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM tickets {condition}"),
            values.as_slice(),
            |row| row.get(0),
        )?;

        let by_status = group_counts(conn, "status", condition, &values, |raw| {
            raw.parse::<TicketStatus>()
                .map_or_else(|_| raw.to_string(), |s| s.as_str().to_string())
        })?;
        let by_type = group_counts(conn, "ticket_type", condition, &values, |raw| {
            normalize_ticket_type(raw).unwrap_or_else(|_| raw.to_string())
        })?;
        let by_priority = group_counts(conn, "priority", condition, &values, |raw| {
            raw.parse::<Priority>()
                .map_or_else(|_| raw.to_string(), |p| p.as_str().to_string())
        })?;

        Ok(TicketStats {
            total: u64::try_from(total).unwrap_or(0),
            by_status,
            by_type,
            by_priority,
        })
    }

    /// Append a comment.
    pub fn insert_comment(
        conn: &Connection,
        ticket_id: TicketId,
        caller: &Caller,
        comment: &NewComment,
        at: NaiveDateTime,
    ) -> Result<Comment> {
        let content = comment.content.trim().to_string();
        let attachment_path = comment
            .attachment_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        let _ = conn.execute(
            "INSERT INTO ticket_comments (ticket_id, commenter_id, commenter_name, content, \
             attachment_path, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                ticket_id.get(),
                caller.user_id.get(),
                caller.operator_name(),
                content,
                attachment_path,
                at,
            ],
        )?;
        Ok(Comment {
            id: conn.last_insert_rowid(),
            ticket_id,
            commenter_id: caller.user_id,
            commenter_name: caller.operator_name().to_string(),
            content,
            attachment_path,
            created_at: at,
        })
    }

    /// Comments on a ticket, newest first.
    pub fn list_comments(conn: &Connection, ticket_id: TicketId) -> Result<Vec<Comment>> {
        let mut stmt = conn.prepare_cached(
            "SELECT id, ticket_id, commenter_id, commenter_name, content, attachment_path, \
             created_at FROM ticket_comments WHERE ticket_id = ?1 \
             ORDER BY created_at DESC, id DESC",
        )?;
        let mut rows = stmt.query(params![ticket_id.get()])?;
        let mut comments = Vec::new();
        while let Some(row) = rows.next()? {
            comments.push(comment_from_row(row)?);
        }
        Ok(comments)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal
// ─────────────────────────────────────────────────────────────────────────────

type SqlValues = Vec<Box<dyn rusqlite::types::ToSql>>;

fn scope_clause(scope: Option<&Caller>) -> (Vec<String>, SqlValues) {
    let mut conditions = Vec::new();
    let mut values: SqlValues = Vec::new();
    if let Some(caller) = scope.filter(|c| !c.is_admin) {
        conditions.push("(creator_id = ? OR assigned_to = ?)".to_string());
        values.push(Box::new(caller.user_id.get()));
        values.push(Box::new(caller.nickname.clone()));
    }
    (conditions, values)
}

/// `column IN (?, ...)` over every label a filter value may be stored as.
fn push_any_of(
    conditions: &mut Vec<String>,
    values: &mut SqlValues,
    column: &str,
    labels: &[&str],
) {
    let placeholders = vec!["?"; labels.len()].join(", ");
    conditions.push(format!("{column} IN ({placeholders})"));
    values.extend(
        labels
            .iter()
            .map(|label| Box::new((*label).to_string()) as Box<dyn rusqlite::types::ToSql>),
    );
}

fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

fn end_of_day(day: chrono::NaiveDate) -> NaiveDateTime {
    day.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| day.and_time(NaiveTime::MIN))
}

fn group_counts(
    conn: &Connection,
    column: &str,
    condition: &str,
    values: &[&dyn rusqlite::types::ToSql],
    normalize: impl Fn(&str) -> String,
) -> Result<BTreeMap<String, u64>> {
    let sql = format!("SELECT {column}, COUNT(*) FROM tickets {condition} GROUP BY {column}");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(values)?;
    let mut counts = BTreeMap::new();
    while let Some(row) = rows.next()? {
        let key: String = row.get(0)?;
        let count: i64 = row.get(1)?;
        *counts.entry(normalize(&key)).or_insert(0) += u64::try_from(count).unwrap_or(0);
    }
    Ok(counts)
}

fn ticket_from_row(row: &rusqlite::Row<'_>) -> Result<Ticket> {
    const T: &str = "tickets";
    let priority: String = get(row, 6, T, "priority")?;
    let status: String = get(row, 7, T, "status")?;
    Ok(Ticket {
        id: TicketId::new(get(row, 0, T, "id")?),
        ticket_no: get(row, 1, T, "ticket_no")?,
        artist_id: get_opt::<i64>(row, 2, T, "artist_id")?.map(ArtistId::new),
        title: get(row, 3, T, "title")?,
        description: get_opt(row, 4, T, "description")?,
        ticket_type: {
            let raw: String = get(row, 5, T, "ticket_type")?;
            normalize_ticket_type(&raw).unwrap_or(raw)
        },
        priority: parse_enum(&priority, T, "priority")?,
        status: parse_enum(&status, T, "status")?,
        creator_id: UserId::new(get(row, 8, T, "creator_id")?),
        assigned_to: get_opt(row, 9, T, "assigned_to")?,
        due_date: get_opt(row, 10, T, "due_date")?,
        completed_at: get_opt(row, 11, T, "completed_at")?,
        attachment_path: get_opt(row, 12, T, "attachment_path")?,
        created_at: get(row, 13, T, "created_at")?,
        updated_at: get(row, 14, T, "updated_at")?,
    })
}

fn comment_from_row(row: &rusqlite::Row<'_>) -> Result<Comment> {
    const T: &str = "ticket_comments";
    Ok(Comment {
        id: get(row, 0, T, "id")?,
        ticket_id: TicketId::new(get(row, 1, T, "ticket_id")?),
        commenter_id: UserId::new(get(row, 2, T, "commenter_id")?),
        commenter_name: get(row, 3, T, "commenter_name")?,
        content: get(row, 4, T, "content")?,
        attachment_path: get_opt(row, 5, T, "attachment_path")?,
        created_at: get(row, 6, T, "created_at")?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
