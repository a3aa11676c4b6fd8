//! # agency-core
//!
//! Foundation types shared by every agency crate:
//!
//! - **Branded IDs**: `ArtistId`, `ProjectId`, `ActivityId`, `TicketId`, `UserId`
//!   as integer newtypes so a ticket id can never be passed where an artist id
//!   is expected
//! - **Caller identity**: [`Caller`], passed explicitly into every engine call
//! - **Clocks**: [`Clock`] with a wall-clock and a pinned implementation
//! - **Logging**: [`logging::init_subscriber`] for the `tracing` subscriber

#![deny(unsafe_code)]

pub mod caller;
pub mod clock;
pub mod ids;
pub mod logging;

pub use caller::Caller;
pub use clock::{Clock, FixedClock, SystemClock};
pub use ids::{ActivityId, ArtistId, ProjectId, TicketId, UserId};
