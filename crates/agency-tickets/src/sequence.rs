//! Daily ticket numbering: `<prefix><YYYYMMDD><seq4>`.
//!
//! The next number is derived from the largest number already stored for the
//! day. Reading the maximum and inserting the new row must happen inside one
//! `BEGIN IMMEDIATE` transaction; [`allocate`] assumes its connection is in
//! such a transaction. The unique index on `ticket_no` backs this up.

use agency_store::row_helpers::escape_like;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::{Result, TicketError};

/// Width of the zero-padded sequence suffix.
pub const SEQUENCE_WIDTH: usize = 4;

/// Largest sequence a single day can hold.
pub const MAX_DAILY_SEQUENCE: u32 = 9999;

/// The part of a ticket number shared by every ticket of `day`.
pub fn day_prefix(prefix: &str, day: NaiveDate) -> String {
    format!("{prefix}{}", day.format("%Y%m%d"))
}

/// Format a complete ticket number.
pub fn format_ticket_no(prefix: &str, day: NaiveDate, seq: u32) -> String {
    format!("{}{seq:0width$}", day_prefix(prefix, day), width = SEQUENCE_WIDTH)
}

/// Sequence suffix of `ticket_no` if it belongs to `day_prefix`.
pub fn parse_sequence(ticket_no: &str, day_prefix: &str) -> Option<u32> {
    let tail = ticket_no.strip_prefix(day_prefix)?;
    if tail.len() != SEQUENCE_WIDTH || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    tail.parse().ok()
}

/// Compute the next ticket number for `day` from what is stored.
///
/// Read-only. Inside an immediate transaction the result is what the next
/// insert will use; outside one it is only a preview.
pub fn allocate(conn: &Connection, prefix: &str, day: NaiveDate) -> Result<String> {
    let stem = day_prefix(prefix, day);
    let last = max_sequence(conn, &stem)?;
    let next = last + 1;
    if next > MAX_DAILY_SEQUENCE {
        return Err(TicketError::SequenceGeneration(format!(
            "daily ticket limit of {MAX_DAILY_SEQUENCE} reached for {stem}"
        )));
    }
    Ok(format_ticket_no(prefix, day, next))
}

fn max_sequence(conn: &Connection, stem: &str) -> Result<u32> {
    let pattern = format!("{}%", escape_like(stem));
    let len = i64::try_from(stem.len() + SEQUENCE_WIDTH).unwrap_or(i64::MAX);
    let max: Option<String> = conn
        .query_row(
            "SELECT MAX(ticket_no) FROM tickets \
             WHERE ticket_no LIKE ?1 ESCAPE '\\' AND length(ticket_no) = ?2 \
             AND substr(ticket_no, -4) GLOB '[0-9][0-9][0-9][0-9]'",
            params![pattern, len],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| TicketError::SequenceGeneration(format!("reading last ticket number: {e}")))?
        .flatten();

    match max {
        None => Ok(0),
        Some(no) => parse_sequence(&no, stem).ok_or_else(|| {
            TicketError::SequenceGeneration(format!("stored ticket number {no:?} is malformed"))
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
