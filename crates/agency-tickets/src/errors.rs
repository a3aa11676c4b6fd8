//! Ticket error types.

use agency_store::StoreError;
use thiserror::Error;

/// Errors returned by ticket operations.
#[derive(Debug, Error)]
pub enum TicketError {
    /// Ticket does not exist, or the caller may not see it.
    #[error("ticket not found: {0}")]
    NotFound(String),

    /// Missing required field or malformed value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Status change not permitted by the transition table.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Requested status, as given.
        to: String,
    },

    /// Ticket number allocation failed.
    #[error("ticket number allocation failed: {0}")]
    SequenceGeneration(String),

    /// Backing store failure. The message stays generic; the cause is the source.
    #[error("storage failure")]
    Storage(#[source] StoreError),
}

impl TicketError {
    /// Shorthand for [`TicketError::InvalidArgument`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

impl From<StoreError> for TicketError {
    fn from(e: StoreError) -> Self {
        Self::Storage(e)
    }
}

impl From<rusqlite::Error> for TicketError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(StoreError::Sqlite(e))
    }
}

impl From<serde_json::Error> for TicketError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(StoreError::Serde(e))
    }
}

/// Convenience type alias for ticket results.
pub type Result<T> = std::result::Result<T, TicketError>;
