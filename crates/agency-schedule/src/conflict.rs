//! Conflict detection between a candidate range and an artist's commitments.

use agency_core::ArtistId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commitment::{Commitment, CommitmentKind, CommitmentRef};
use crate::errors::Result;
use crate::interval::Interval;
use crate::source::CommitmentSource;

/// "Would this range clash with anything the artist already has?"
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConflictQuery {
    /// Artist whose commitments are checked.
    pub artist_id: ArtistId,
    /// Range being proposed.
    pub candidate: Interval,
    /// Commitment to ignore, usually the one being edited.
    pub exclude: Option<CommitmentRef>,
}

impl ConflictQuery {
    /// Validate the candidate bounds (`start <= end`).
    pub fn new(artist_id: ArtistId, start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        Ok(Self {
            artist_id,
            candidate: Interval::try_new(start, end)?,
            exclude: None,
        })
    }

    /// Ignore the given commitment when checking.
    #[must_use]
    pub fn excluding(mut self, kind: CommitmentKind, id: i64) -> Self {
        self.exclude = Some(CommitmentRef::new(kind, id));
        self
    }
}

/// Outcome of a conflict check.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    /// `!conflicts.is_empty()`.
    pub has_conflict: bool,
    /// Overlapping commitments, ordered by kind then id.
    pub conflicts: Vec<Commitment>,
}

impl ConflictReport {
    /// Wrap a conflict list, deriving `has_conflict`.
    pub fn from_conflicts(conflicts: Vec<Commitment>) -> Self {
        Self {
            has_conflict: !conflicts.is_empty(),
            conflicts,
        }
    }
}

/// Every commitment of the artist whose effective range overlaps the candidate.
///
/// Commitments with no effective range never conflict.
pub fn find_conflicts<S>(source: &S, query: &ConflictQuery) -> Result<Vec<Commitment>>
where
    S: CommitmentSource + ?Sized,
{
    let mut conflicts: Vec<Commitment> = source
        .list_all_by_artist(query.artist_id)?
        .into_iter()
        .filter(|c| query.exclude != Some(c.reference()))
        .filter(|c| {
            c.effective_range()
                .is_some_and(|r| r.overlaps(&query.candidate))
        })
        .collect();
    conflicts.sort_by_key(Commitment::reference);

    debug!(
        artist_id = %query.artist_id,
        candidate = %query.candidate,
        conflicts = conflicts.len(),
        "conflict check"
    );
    Ok(conflicts)
}

/// [`find_conflicts`] wrapped in a [`ConflictReport`].
pub fn check_conflict<S>(source: &S, query: &ConflictQuery) -> Result<ConflictReport>
where
    S: CommitmentSource + ?Sized,
{
    find_conflicts(source, query).map(ConflictReport::from_conflicts)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    use super::*;
    use crate::errors::ScheduleError;
    use crate::interval::{BoundSide, parse_bound};
    use crate::source::MemorySource;

    const LIN: ArtistId = ArtistId::new(1);

    fn start(s: &str) -> NaiveDateTime {
        parse_bound(s, BoundSide::Start).unwrap()
    }

    fn end(s: &str) -> NaiveDateTime {
        parse_bound(s, BoundSide::End).unwrap()
    }

    fn activity(id: i64, from: &str, to: &str) -> Commitment {
        Commitment {
            kind: CommitmentKind::Activity,
            related_id: id,
            title: format!("activity {id}"),
            start: Some(start(from)),
            end: Some(end(to)),
            fallback_date: None,
            description: None,
            schedule_info: None,
        }
    }

    fn release(id: i64, day: &str) -> Commitment {
        Commitment {
            kind: CommitmentKind::Project,
            related_id: id,
            title: format!("project {id}"),
            start: None,
            end: None,
            fallback_date: Some(NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap()),
            description: None,
            schedule_info: None,
        }
    }

    #[test]
    fn self_exclusion_hides_own_record() {
        let mut source = MemorySource::new();
        let _ = source.add(LIN, activity(5, "2024-02-01", "2024-02-05"));

        let query = ConflictQuery::new(LIN, start("2024-02-01"), end("2024-02-05"))
            .unwrap()
            .excluding(CommitmentKind::Activity, 5);
        assert!(find_conflicts(&source, &query).unwrap().is_empty());

        let unexcluded = ConflictQuery::new(LIN, start("2024-02-01"), end("2024-02-05")).unwrap();
        assert_eq!(find_conflicts(&source, &unexcluded).unwrap().len(), 1);
    }

    #[test]
    fn exclusion_matches_kind_as_well_as_id() {
        let mut source = MemorySource::new();
        let _ = source
            .add(LIN, activity(5, "2024-02-01", "2024-02-05"))
            .add(LIN, release(5, "2024-02-03"));

        let query = ConflictQuery::new(LIN, start("2024-02-01"), end("2024-02-05"))
            .unwrap()
            .excluding(CommitmentKind::Activity, 5);
        let conflicts = find_conflicts(&source, &query).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, CommitmentKind::Project);
    }

    #[test]
    fn touching_day_is_a_conflict() {
        let mut source = MemorySource::new();
        let _ = source.add(LIN, activity(1, "2024-01-01", "2024-01-10"));
        let query = ConflictQuery::new(LIN, start("2024-01-10"), end("2024-01-20")).unwrap();
        assert!(check_conflict(&source, &query).unwrap().has_conflict);
    }

    #[test]
    fn release_date_counts_as_commitment() {
        let mut source = MemorySource::new();
        let _ = source.add(LIN, release(3, "2024-03-15"));
        let query = ConflictQuery::new(LIN, start("2024-03-15 20:00"), end("2024-03-16")).unwrap();
        assert_eq!(find_conflicts(&source, &query).unwrap().len(), 1);
    }

    #[test]
    fn results_are_ordered_kind_then_id() {
        let mut source = MemorySource::new();
        let _ = source
            .add(LIN, activity(9, "2024-04-01", "2024-04-30"))
            .add(LIN, activity(2, "2024-04-01", "2024-04-30"))
            .add(LIN, release(7, "2024-04-10"))
            .add(LIN, release(4, "2024-04-11"));
        let query = ConflictQuery::new(LIN, start("2024-04-01"), end("2024-04-30")).unwrap();
        let refs: Vec<_> = find_conflicts(&source, &query)
            .unwrap()
            .iter()
            .map(|c| (c.kind, c.related_id))
            .collect();
        assert_eq!(
            refs,
            vec![
                (CommitmentKind::Project, 4),
                (CommitmentKind::Project, 7),
                (CommitmentKind::Activity, 2),
                (CommitmentKind::Activity, 9),
            ]
        );
    }

    #[test]
    fn other_artists_are_ignored() {
        let mut source = MemorySource::new();
        let _ = source.add(ArtistId::new(2), activity(1, "2024-01-01", "2024-01-31"));
        let query = ConflictQuery::new(LIN, start("2024-01-01"), end("2024-01-31")).unwrap();
        let report = check_conflict(&source, &query).unwrap();
        assert!(!report.has_conflict);
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn unscheduled_commitments_never_conflict() {
        let mut source = MemorySource::new();
        let _ = source.add(
            LIN,
            Commitment {
                kind: CommitmentKind::Project,
                related_id: 1,
                title: "TBD".into(),
                start: None,
                end: None,
                fallback_date: None,
                description: None,
                schedule_info: None,
            },
        );
        let query = ConflictQuery::new(LIN, start("2000-01-01"), end("2099-12-31")).unwrap();
        assert!(find_conflicts(&source, &query).unwrap().is_empty());
    }

    #[test]
    fn reversed_candidate_is_rejected() {
        assert_matches!(
            ConflictQuery::new(LIN, start("2024-02-05"), end("2024-02-01")),
            Err(ScheduleError::InvalidArgument(_))
        );
    }
}
