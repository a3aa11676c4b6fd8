//! # agency-schedule
//!
//! Scheduling and conflict detection for agency artists.
//!
//! An artist's schedule is a view over the projects and activities they are a
//! member of, rebuilt on every call. Each source row becomes a [`Commitment`]
//! whose effective range falls back to the release or activity date when no
//! explicit bounds are stored.
//!
//! - [`interval`]: closed intervals, inclusive overlap, calendar months
//! - [`aggregator`]: ordered per-artist schedules, monthly views, stats, overview
//! - [`conflict`]: candidate-range checks with self-exclusion
//! - [`source`]: the [`CommitmentSource`] seam and its SQLite implementation
//! - [`service`]: [`ScheduleService`], including transactional reschedules

#![deny(unsafe_code)]

pub mod aggregator;
pub mod catalog;
pub mod commitment;
pub mod conflict;
pub mod errors;
pub mod interval;
pub mod service;
pub mod source;

pub use aggregator::{OverviewEntry, ScheduleStats};
pub use catalog::{Artist, CatalogRepo, NewEntity};
pub use commitment::{Commitment, CommitmentKind, CommitmentRef};
pub use conflict::{ConflictQuery, ConflictReport, check_conflict, find_conflicts};
pub use errors::{Result, ScheduleError};
pub use interval::{BoundSide, Interval, Month, overlaps, parse_bound};
pub use service::{ArtistConflicts, RescheduleOutcome, ScheduleService};
pub use source::{CommitmentSource, MemorySource};
