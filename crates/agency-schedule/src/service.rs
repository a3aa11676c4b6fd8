//! Schedule service: the application-facing entry points.
//!
//! Read operations check out a pooled connection and run the pure engine
//! functions over it. [`ScheduleService::reschedule`] is the only writer; it
//! runs the conflict check and the write inside one `BEGIN IMMEDIATE`
//! transaction so no other writer can slip an overlapping change in between.

use std::sync::Arc;

use agency_core::{ArtistId, Caller, Clock};
use agency_settings::{ScheduleSettings, SortOrder};
use agency_store::{AuditAction, AuditRepo, AuditSubject, Database, NewAuditEntry};
use chrono::NaiveDateTime;
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::aggregator::{self, OverviewEntry, ScheduleStats};
use crate::catalog::CatalogRepo;
use crate::commitment::{Commitment, CommitmentKind, CommitmentRef};
use crate::conflict::{self, ConflictQuery, ConflictReport};
use crate::errors::{Result, ScheduleError};
use crate::interval::{Interval, Month};

/// Conflicts found for one member artist during a reschedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArtistConflicts {
    /// Member artist.
    pub artist_id: ArtistId,
    /// That artist's other commitments overlapping the new range.
    pub conflicts: Vec<Commitment>,
}

/// Result of a successful reschedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RescheduleOutcome {
    /// The commitment as stored after the write.
    pub commitment: Commitment,
    /// Effective range before the write.
    pub previous: Option<Interval>,
    /// Advisory conflicts, per member artist. Empty when there are none.
    pub conflicts: Vec<ArtistConflicts>,
}

impl RescheduleOutcome {
    /// Whether any member artist has a conflict with the new range.
    pub fn has_conflict(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Entry points for schedule views, conflict checks, and reschedules.
#[derive(Clone)]
pub struct ScheduleService {
    db: Database,
    settings: ScheduleSettings,
    clock: Arc<dyn Clock>,
}

impl ScheduleService {
    /// Build a service over an opened database.
    pub fn new(db: Database, settings: ScheduleSettings, clock: Arc<dyn Clock>) -> Self {
        Self { db, settings, clock }
    }

    /// An artist's merged schedule, optionally limited to `range`.
    ///
    /// `order` falls back to the configured default.
    #[instrument(skip(self), fields(artist_id = %artist))]
    pub fn list_schedule(
        &self,
        artist: ArtistId,
        range: Option<Interval>,
        order: Option<SortOrder>,
    ) -> Result<Vec<Commitment>> {
        let conn = self.db.conn()?;
        ensure_artist(&conn, artist)?;
        aggregator::list_schedule(
            &*conn,
            artist,
            range.as_ref(),
            order.unwrap_or(self.settings.default_order),
        )
    }

    /// An artist's commitments overlapping `month`, earliest first.
    #[instrument(skip(self), fields(artist_id = %artist, month = %month))]
    pub fn list_monthly_schedule(&self, artist: ArtistId, month: Month) -> Result<Vec<Commitment>> {
        let conn = self.db.conn()?;
        ensure_artist(&conn, artist)?;
        aggregator::list_monthly_schedule(&*conn, artist, month)
    }

    /// Commitment counts, overall and for `month` (default: the current month).
    #[instrument(skip(self), fields(artist_id = %artist))]
    pub fn schedule_stats(&self, artist: ArtistId, month: Option<Month>) -> Result<ScheduleStats> {
        let month = month.unwrap_or_else(|| Month::containing(self.clock.today()));
        let conn = self.db.conn()?;
        ensure_artist(&conn, artist)?;
        aggregator::schedule_stats(&*conn, artist, month)
    }

    /// Overlaps between a candidate range and the artist's commitments.
    #[instrument(skip(self, query), fields(artist_id = %query.artist_id))]
    pub fn check_conflict(&self, query: &ConflictQuery) -> Result<ConflictReport> {
        let conn = self.db.conn()?;
        ensure_artist(&conn, query.artist_id)?;
        let report = conflict::check_conflict(&*conn, query)?;
        if report.has_conflict {
            info!(conflicts = report.conflicts.len(), "schedule conflicts detected");
        }
        Ok(report)
    }

    /// All artists' commitments overlapping `month` (default: the current month).
    #[instrument(skip(self))]
    pub fn monthly_overview(&self, month: Option<Month>) -> Result<Vec<OverviewEntry>> {
        let month = month.unwrap_or_else(|| Month::containing(self.clock.today()));
        let conn = self.db.conn()?;
        let artists: Vec<(ArtistId, String)> = CatalogRepo::list_artists(&conn)?
            .into_iter()
            .map(|a| (a.id, a.name))
            .collect();
        aggregator::monthly_overview(&*conn, &artists, month)
    }

    /// Replace a project's or activity's explicit time range.
    ///
    /// Every member artist is checked for conflicts, ignoring the target
    /// itself. With enforcement on, any conflict aborts the write with
    /// [`ScheduleError::Conflict`]; otherwise conflicts come back in the
    /// outcome. Writes one `rescheduled` audit entry.
    #[instrument(skip(self, caller), fields(target = %target, operator = %caller.user_id))]
    pub fn reschedule(
        &self,
        caller: &Caller,
        target: CommitmentRef,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<RescheduleOutcome> {
        if let (Some(s), Some(e)) = (start, end) {
            let _ = Interval::try_new(s, e)?;
        }

        let mut conn = self.db.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = CatalogRepo::find_commitment(&tx, target)?
            .ok_or_else(|| ScheduleError::NotFound(target.to_string()))?;
        let previous = current.effective_range();
        let proposed = Commitment {
            start,
            end,
            ..current.clone()
        };

        let mut conflicts = Vec::new();
        if let Some(range) = proposed.effective_range() {
            for artist_id in CatalogRepo::members(&tx, target)? {
                let query = ConflictQuery {
                    artist_id,
                    candidate: range,
                    exclude: Some(target),
                };
                let found = conflict::find_conflicts(&*tx, &query)?;
                if !found.is_empty() {
                    conflicts.push(ArtistConflicts {
                        artist_id,
                        conflicts: found,
                    });
                }
            }
        }

        if !conflicts.is_empty() {
            let total: usize = conflicts.iter().map(|a| a.conflicts.len()).sum();
            if self.settings.enforce_conflicts {
                warn!(conflicts = total, "reschedule rejected by conflict enforcement");
                let merged = conflicts.into_iter().flat_map(|a| a.conflicts).collect();
                return Err(ScheduleError::Conflict(ConflictReport::from_conflicts(merged)));
            }
            info!(conflicts = total, "reschedule proceeds with advisory conflicts");
        }

        let _ = CatalogRepo::set_time_range(&tx, target, start, end)?;
        let _ = AuditRepo::append(
            &tx,
            &NewAuditEntry::new(
                audit_subject(target.kind),
                target.id,
                caller,
                AuditAction::Rescheduled,
                self.clock.now(),
            )
            .with_change(
                "time_range",
                Some(range_json(current.start, current.end)?),
                Some(range_json(start, end)?),
            ),
        )?;
        tx.commit()?;

        info!(previous = ?previous, "commitment rescheduled");
        Ok(RescheduleOutcome {
            commitment: proposed,
            previous,
            conflicts,
        })
    }
}

fn ensure_artist(conn: &Connection, artist: ArtistId) -> Result<()> {
    match CatalogRepo::get_artist(conn, artist)? {
        Some(_) => Ok(()),
        None => Err(ScheduleError::NotFound(format!("artist {artist}"))),
    }
}

fn audit_subject(kind: CommitmentKind) -> AuditSubject {
    match kind {
        CommitmentKind::Project => AuditSubject::Project,
        CommitmentKind::Activity => AuditSubject::Activity,
    }
}

fn range_json(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Result<String> {
    serde_json::to_string(&serde_json::json!({ "start": start, "end": end }))
        .map_err(|e| ScheduleError::Storage(e.into()))
}
