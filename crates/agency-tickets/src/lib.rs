//! # agency-tickets
//!
//! Work tickets: creation with collision-free daily numbering, a validated
//! status lifecycle, assignment, comments, and a complete audit trail.
//!
//! Non-admin callers only ever see tickets they created or are assigned to.

#![deny(unsafe_code)]

pub mod errors;
pub mod repository;
pub mod sequence;
pub mod service;
pub mod transitions;
pub mod types;

pub use errors::{Result, TicketError};
pub use repository::TicketRepo;
pub use service::TicketService;
pub use transitions::TransitionTable;
pub use types::{
    Comment, NewComment, Priority, Ticket, TicketDraft, TicketFilter, TicketPatch, TicketStats,
    TicketStatus, normalize_ticket_type, ticket_type_labels,
};
