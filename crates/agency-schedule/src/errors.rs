//! Error types for schedule queries and reschedules.

use agency_store::StoreError;
use thiserror::Error;

use crate::conflict::ConflictReport;

/// Errors returned by the schedule engine and service.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Referenced artist, project, or activity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed month, date, or range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A reschedule was rejected because conflict enforcement is on.
    #[error("schedule conflict with {} existing commitment(s)", .0.conflicts.len())]
    Conflict(ConflictReport),

    /// Backing store failure. The message stays generic; the cause is the source.
    #[error("storage failure")]
    Storage(#[source] StoreError),
}

impl ScheduleError {
    /// Shorthand for [`ScheduleError::InvalidArgument`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

impl From<StoreError> for ScheduleError {
    fn from(e: StoreError) -> Self {
        Self::Storage(e)
    }
}

impl From<rusqlite::Error> for ScheduleError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(StoreError::Sqlite(e))
    }
}

/// Convenience type alias for schedule results.
pub type Result<T> = std::result::Result<T, ScheduleError>;
