//! Ticket service: lifecycle operations with audit logging and visibility.
//!
//! Every mutation runs in one `BEGIN IMMEDIATE` transaction together with its
//! audit entry, so a failure leaves neither behind. Callers that may not see a
//! ticket get [`TicketError::NotFound`] for it, the same as for a missing one.

use std::sync::Arc;

use agency_core::{Caller, Clock, TicketId};
use agency_settings::TicketSettings;
use agency_store::{
    AuditAction, AuditEntry, AuditRepo, AuditSubject, Database, LogOrder, NewAuditEntry,
    PooledConnection,
};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::errors::{Result, TicketError};
use crate::repository::TicketRepo;
use crate::sequence;
use crate::transitions::TransitionTable;
use crate::types::{
    Comment, NewComment, Priority, Ticket, TicketDraft, TicketFilter, TicketPatch, TicketStats,
    TicketStatus, normalize_ticket_type,
};

/// Entry points for the ticket lifecycle.
#[derive(Clone)]
pub struct TicketService {
    db: Database,
    prefix: String,
    default_type: String,
    default_priority: Priority,
    transitions: TransitionTable,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TicketService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketService")
            .field("db", &self.db)
            .field("prefix", &self.prefix)
            .field("default_type", &self.default_type)
            .field("default_priority", &self.default_priority)
            .field("transitions", &self.transitions)
            .finish_non_exhaustive()
    }
}

impl TicketService {
    /// Build a service, validating the ticket settings.
    pub fn new(db: Database, settings: &TicketSettings, clock: Arc<dyn Clock>) -> Result<Self> {
        let transitions = match settings.transitions {
            Some(ref config) => TransitionTable::from_config(config)?,
            None => TransitionTable::default(),
        };
        Ok(Self {
            db,
            prefix: settings.number_prefix.clone(),
            default_type: normalize_ticket_type(&settings.default_type)?,
            default_priority: settings.default_priority.parse()?,
            transitions,
            clock,
        })
    }

    /// The active transition table.
    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    /// Create a ticket and allocate its number.
    ///
    /// Allocation reads the day's highest number and inserts the new row in
    /// the same immediate transaction, so concurrent creators are serialized
    /// by the database write lock.
    #[instrument(skip(self, caller, draft), fields(creator = %caller.user_id))]
    pub fn create_ticket(&self, caller: &Caller, draft: TicketDraft) -> Result<Ticket> {
        let title = required(&draft.title, "title")?;
        let ticket_type = match draft.ticket_type {
            Some(ref raw) => normalize_ticket_type(raw)?,
            None => self.default_type.clone(),
        };
        let status = draft.status.unwrap_or(TicketStatus::Pending);
        let now = self.clock.now();

        let mut conn = self.allocation_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| TicketError::SequenceGeneration(format!("locking for allocation: {e}")))?;

        let ticket_no = sequence::allocate(&tx, &self.prefix, now.date())?;
        let mut ticket = Ticket {
            id: TicketId::new(0),
            ticket_no,
            artist_id: draft.artist_id,
            title,
            description: optional_text(draft.description.as_deref()),
            ticket_type,
            priority: draft.priority.unwrap_or(self.default_priority),
            status,
            creator_id: caller.user_id,
            assigned_to: optional_text(draft.assigned_to.as_deref()),
            due_date: draft.due_date,
            completed_at: (status == TicketStatus::Completed).then_some(now),
            attachment_path: optional_text(draft.attachment_path.as_deref()),
            created_at: now,
            updated_at: now,
        };
        ticket.id = TicketRepo::insert(&tx, &ticket).map_err(|e| match e {
            TicketError::Storage(ref store) if store.is_unique_violation() => {
                TicketError::SequenceGeneration(format!(
                    "ticket number {} already taken",
                    ticket.ticket_no
                ))
            }
            other => other,
        })?;

        let _ = AuditRepo::append(
            &tx,
            &NewAuditEntry::new(
                AuditSubject::Ticket,
                ticket.id.get(),
                caller,
                AuditAction::Created,
                now,
            )
            .with_change("ticket_no", None, Some(ticket.ticket_no.clone())),
        )?;
        tx.commit()?;

        info!(ticket_no = %ticket.ticket_no, id = %ticket.id, "ticket created");
        Ok(ticket)
    }

    /// Load one ticket.
    #[instrument(skip(self, caller), fields(ticket_id = %id))]
    pub fn get_ticket(&self, caller: &Caller, id: TicketId) -> Result<Ticket> {
        let conn = self.db.conn()?;
        load_visible(&conn, caller, id)
    }

    /// Edit title, description, type, priority, due date, or attachment.
    ///
    /// Writes exactly one `updated` audit entry. `field_changed` lists the
    /// fields whose values actually changed, comma separated, and the old and
    /// new values are JSON objects keyed by those fields.
    #[instrument(skip(self, caller, patch), fields(ticket_id = %id, operator = %caller.user_id))]
    pub fn update_ticket(&self, caller: &Caller, id: TicketId, patch: TicketPatch) -> Result<Ticket> {
        let mut conn = self.db.conn()?;
        let tx = begin(&mut conn)?;
        let current = load_visible(&tx, caller, id)?;
        let mut next = current.clone();
        let mut changes = Changes::default();

        if let Some(ref raw) = patch.title {
            next.title = required(raw, "title")?;
            changes.record("title", &current.title, &next.title)?;
        }
        if let Some(ref raw) = patch.description {
            next.description = optional_text(Some(raw.as_str()));
            changes.record("description", &current.description, &next.description)?;
        }
        if let Some(ref raw) = patch.ticket_type {
            next.ticket_type = normalize_ticket_type(raw)?;
            changes.record("ticket_type", &current.ticket_type, &next.ticket_type)?;
        }
        if let Some(priority) = patch.priority {
            next.priority = priority;
            changes.record("priority", &current.priority, &next.priority)?;
        }
        if let Some(due) = patch.due_date {
            next.due_date = due;
            changes.record("due_date", &current.due_date, &next.due_date)?;
        }
        if let Some(ref raw) = patch.attachment_path {
            next.attachment_path = optional_text(Some(raw.as_str()));
            changes.record(
                "attachment_path",
                &current.attachment_path,
                &next.attachment_path,
            )?;
        }

        let now = self.clock.now();
        next.updated_at = now;
        let _ = TicketRepo::save(&tx, &next)?;

        let mut entry =
            NewAuditEntry::new(AuditSubject::Ticket, id.get(), caller, AuditAction::Updated, now);
        if let Some((fields, old, new)) = changes.finish()? {
            entry = entry.with_change(fields, Some(old), Some(new));
        } else {
            debug!("update left every field unchanged");
        }
        let _ = AuditRepo::append(&tx, &entry)?;
        tx.commit()?;

        Ok(next)
    }

    /// Move a ticket to `requested`.
    ///
    /// The name is resolved against the transition table; unknown names and
    /// disallowed edges fail with [`TicketError::InvalidTransition`] and leave
    /// the ticket untouched. Entering `completed` stamps `completed_at`;
    /// leaving it clears the stamp.
    #[instrument(skip(self, caller), fields(ticket_id = %id, operator = %caller.user_id))]
    pub fn change_status(&self, caller: &Caller, id: TicketId, requested: &str) -> Result<Ticket> {
        let mut conn = self.db.conn()?;
        let tx = begin(&mut conn)?;
        let current = load_visible(&tx, caller, id)?;

        let to = match self.transitions.check(current.status, requested) {
            Ok(to) => to,
            Err(e) => {
                warn!(from = %current.status, to = requested, "status transition rejected");
                return Err(e);
            }
        };

        let now = self.clock.now();
        let mut next = current.clone();
        next.status = to;
        next.completed_at = match to {
            TicketStatus::Completed => Some(now),
            _ if current.status == TicketStatus::Completed => None,
            _ => current.completed_at,
        };
        next.updated_at = now;
        let _ = TicketRepo::save(&tx, &next)?;

        let _ = AuditRepo::append(
            &tx,
            &NewAuditEntry::new(AuditSubject::Ticket, id.get(), caller, AuditAction::Updated, now)
                .with_change(
                    "status",
                    Some(current.status.to_string()),
                    Some(to.to_string()),
                ),
        )?;
        tx.commit()?;

        info!(
            ticket_no = %next.ticket_no,
            from = %current.status,
            to = %to,
            "ticket status changed"
        );
        Ok(next)
    }

    /// Set or clear the assignee nickname.
    #[instrument(skip(self, caller), fields(ticket_id = %id, operator = %caller.user_id))]
    pub fn assign(&self, caller: &Caller, id: TicketId, assignee: Option<&str>) -> Result<Ticket> {
        let mut conn = self.db.conn()?;
        let tx = begin(&mut conn)?;
        let current = load_visible(&tx, caller, id)?;

        let now = self.clock.now();
        let mut next = current.clone();
        next.assigned_to = optional_text(assignee);
        next.updated_at = now;
        let _ = TicketRepo::save(&tx, &next)?;

        let _ = AuditRepo::append(
            &tx,
            &NewAuditEntry::new(AuditSubject::Ticket, id.get(), caller, AuditAction::Assigned, now)
                .with_change("assigned_to", current.assigned_to, next.assigned_to.clone()),
        )?;
        tx.commit()?;

        info!(ticket_no = %next.ticket_no, assignee = ?next.assigned_to, "ticket assigned");
        Ok(next)
    }

    /// Append a comment.
    #[instrument(skip(self, caller, comment), fields(ticket_id = %id, operator = %caller.user_id))]
    pub fn add_comment(&self, caller: &Caller, id: TicketId, comment: &NewComment) -> Result<Comment> {
        let _ = required(&comment.content, "content")?;
        let mut conn = self.db.conn()?;
        let tx = begin(&mut conn)?;
        let _ = load_visible(&tx, caller, id)?;

        let now = self.clock.now();
        let stored = TicketRepo::insert_comment(&tx, id, caller, comment, now)?;
        let _ = AuditRepo::append(
            &tx,
            &NewAuditEntry::new(AuditSubject::Ticket, id.get(), caller, AuditAction::Commented, now)
                .with_change("comment", None, Some(stored.content.clone())),
        )?;
        tx.commit()?;
        Ok(stored)
    }

    /// Comments on a ticket, newest first.
    pub fn list_comments(&self, caller: &Caller, id: TicketId) -> Result<Vec<Comment>> {
        let conn = self.db.conn()?;
        let _ = load_visible(&conn, caller, id)?;
        TicketRepo::list_comments(&conn, id)
    }

    /// Audit trail of a ticket.
    pub fn list_logs(&self, caller: &Caller, id: TicketId, order: LogOrder) -> Result<Vec<AuditEntry>> {
        let conn = self.db.conn()?;
        let _ = load_visible(&conn, caller, id)?;
        Ok(AuditRepo::list(&conn, AuditSubject::Ticket, id.get(), order)?)
    }

    /// Tickets matching `filter` that `caller` may see, newest first.
    #[instrument(skip(self, caller, filter), fields(user = %caller.user_id, admin = caller.is_admin))]
    pub fn list_tickets(&self, caller: &Caller, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        let conn = self.db.conn()?;
        TicketRepo::list(&conn, filter, Some(caller))
    }

    /// Counts over every ticket.
    pub fn ticket_stats(&self) -> Result<TicketStats> {
        let conn = self.db.conn()?;
        TicketRepo::stats(&conn, None)
    }

    /// Counts over tickets assigned to the caller's nickname.
    pub fn my_ticket_stats(&self, caller: &Caller) -> Result<TicketStats> {
        let conn = self.db.conn()?;
        TicketRepo::stats(&conn, Some(caller.nickname.as_str()))
    }

    /// Preview the number the next ticket created today would get.
    ///
    /// Nothing is reserved; a concurrent creator may take it first.
    pub fn next_ticket_no(&self) -> Result<String> {
        let conn = self.allocation_conn()?;
        sequence::allocate(&conn, &self.prefix, self.clock.today())
    }

    fn allocation_conn(&self) -> Result<PooledConnection> {
        self.db
            .conn()
            .map_err(|e| TicketError::SequenceGeneration(format!("acquiring connection: {e}")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal
// ─────────────────────────────────────────────────────────────────────────────

fn begin(conn: &mut PooledConnection) -> Result<Transaction<'_>> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

fn load_visible(conn: &Connection, caller: &Caller, id: TicketId) -> Result<Ticket> {
    TicketRepo::get(conn, id)?
        .filter(|t| t.is_visible_to(caller))
        .ok_or_else(|| TicketError::NotFound(format!("ticket {id}")))
}

fn required(raw: &str, field: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TicketError::invalid(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn optional_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Field-level diff accumulated during an update.
#[derive(Default)]
struct Changes {
    fields: Vec<&'static str>,
    old: Map<String, Value>,
    new: Map<String, Value>,
}

impl Changes {
    fn record<T: serde::Serialize + PartialEq>(
        &mut self,
        field: &'static str,
        old: &T,
        new: &T,
    ) -> Result<()> {
        if old == new {
            return Ok(());
        }
        self.fields.push(field);
        let _ = self.old.insert(field.to_string(), serde_json::to_value(old)?);
        let _ = self.new.insert(field.to_string(), serde_json::to_value(new)?);
        Ok(())
    }

    fn finish(self) -> Result<Option<(String, String, String)>> {
        if self.fields.is_empty() {
            return Ok(None);
        }
        Ok(Some((
            self.fields.join(","),
            serde_json::to_string(&Value::Object(self.old))?,
            serde_json::to_string(&Value::Object(self.new))?,
        )))
    }
}
