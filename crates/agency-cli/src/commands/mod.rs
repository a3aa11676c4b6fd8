//! Subcommand definitions, one module per area.

mod catalog;
mod schedule;
mod ticket;

use agency_schedule::{BoundSide, ScheduleError, parse_bound};
use anyhow::Result;
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;

pub use catalog::CatalogCommand;
pub use schedule::ScheduleCommand;
pub use ticket::TicketCommand;

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// clap parser for a range start: a bare date means midnight.
fn start_bound(raw: &str) -> std::result::Result<NaiveDateTime, ScheduleError> {
    parse_bound(raw, BoundSide::Start)
}

/// clap parser for a range end: a bare date means the last second of the day.
fn end_bound(raw: &str) -> std::result::Result<NaiveDateTime, ScheduleError> {
    parse_bound(raw, BoundSide::End)
}
