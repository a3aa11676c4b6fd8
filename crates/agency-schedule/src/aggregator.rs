//! Per-artist schedule views built from project and activity commitments.
//!
//! Nothing here is cached. Every call re-reads the source, so a view always
//! reflects the latest committed writes.

use std::cmp::Ordering;

use agency_core::ArtistId;
use agency_settings::SortOrder;
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::commitment::{Commitment, CommitmentKind};
use crate::errors::Result;
use crate::interval::{Interval, Month};
use crate::source::CommitmentSource;

/// Merged schedule for one artist.
///
/// With `range`, only commitments whose effective range overlaps it are kept.
/// Sorted by effective start in `order`; unscheduled commitments come last in
/// either direction, and ties fall back to kind then id.
pub fn list_schedule<S>(
    source: &S,
    artist: ArtistId,
    range: Option<&Interval>,
    order: SortOrder,
) -> Result<Vec<Commitment>>
where
    S: CommitmentSource + ?Sized,
{
    let mut entries: Vec<(Option<NaiveDateTime>, Commitment)> = source
        .list_all_by_artist(artist)?
        .into_iter()
        .filter_map(|c| {
            let effective = c.effective_range();
            match (range, effective) {
                (Some(r), Some(e)) if !r.overlaps(&e) => None,
                (Some(_), None) => None,
                _ => Some((effective.map(|e| e.start()), c)),
            }
        })
        .collect();

    entries.sort_by(|(a_start, a), (b_start, b)| {
        compare_starts(*a_start, *b_start, order)
            .then_with(|| a.reference().cmp(&b.reference()))
    });

    Ok(entries.into_iter().map(|(_, c)| c).collect())
}

fn compare_starts(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Asc => a.cmp(&b),
            SortOrder::Desc => b.cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Commitments overlapping `month`, earliest first.
pub fn list_monthly_schedule<S>(source: &S, artist: ArtistId, month: Month) -> Result<Vec<Commitment>>
where
    S: CommitmentSource + ?Sized,
{
    list_schedule(source, artist, Some(&month.interval()), SortOrder::Asc)
}

/// Commitment counts for one artist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScheduleStats {
    /// Month the `month_*` counts refer to.
    pub month: Month,
    /// Projects the artist belongs to.
    pub total_projects: usize,
    /// Activities the artist belongs to.
    pub total_activities: usize,
    /// `total_projects + total_activities`.
    pub total_schedule: usize,
    /// Projects overlapping `month`.
    pub month_projects: usize,
    /// Activities overlapping `month`.
    pub month_activities: usize,
    /// `month_projects + month_activities`.
    pub month_schedule: usize,
}

/// Totals plus the same counts restricted to `month`.
pub fn schedule_stats<S>(source: &S, artist: ArtistId, month: Month) -> Result<ScheduleStats>
where
    S: CommitmentSource + ?Sized,
{
    let window = month.interval();
    let mut total = [0usize; 2];
    let mut in_month = [0usize; 2];

    for (slot, kind) in CommitmentKind::ALL.into_iter().enumerate() {
        let commitments = source.list_by_artist(artist, kind)?;
        total[slot] = commitments.len();
        in_month[slot] = commitments
            .iter()
            .filter(|c| c.effective_range().is_some_and(|r| r.overlaps(&window)))
            .count();
    }

    Ok(ScheduleStats {
        month,
        total_projects: total[0],
        total_activities: total[1],
        total_schedule: total[0] + total[1],
        month_projects: in_month[0],
        month_activities: in_month[1],
        month_schedule: in_month[0] + in_month[1],
    })
}

/// One row of the all-artist monthly overview.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OverviewEntry {
    /// Artist the commitment belongs to.
    pub artist_id: ArtistId,
    /// Artist display name.
    pub artist_name: String,
    /// The commitment itself.
    #[serde(flatten)]
    pub commitment: Commitment,
    /// Effective range used for the month filter.
    pub range: Interval,
    /// Overlaps another of the same artist's commitments within the month.
    pub has_conflict: bool,
}

/// Every artist's commitments overlapping `month`.
///
/// Ordered by effective start, then artist, then kind and id.
pub fn monthly_overview<S>(
    source: &S,
    artists: &[(ArtistId, String)],
    month: Month,
) -> Result<Vec<OverviewEntry>>
where
    S: CommitmentSource + ?Sized,
{
    let window = month.interval();
    let mut overview = Vec::new();

    for (artist_id, artist_name) in artists {
        let in_month: Vec<(Interval, Commitment)> = source
            .list_all_by_artist(*artist_id)?
            .into_iter()
            .filter_map(|c| {
                c.effective_range()
                    .filter(|r| r.overlaps(&window))
                    .map(|r| (r, c))
            })
            .collect();

        for (i, (range, commitment)) in in_month.iter().enumerate() {
            let has_conflict = in_month
                .iter()
                .enumerate()
                .any(|(j, (other, _))| i != j && range.overlaps(other));
            overview.push(OverviewEntry {
                artist_id: *artist_id,
                artist_name: artist_name.clone(),
                commitment: commitment.clone(),
                range: *range,
                has_conflict,
            });
        }
    }

    overview.sort_by(|a, b| {
        a.range
            .start()
            .cmp(&b.range.start())
            .then_with(|| a.artist_id.cmp(&b.artist_id))
            .then_with(|| a.commitment.reference().cmp(&b.commitment.reference()))
    });
    Ok(overview)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::interval::{BoundSide, parse_bound};
    use crate::source::MemorySource;

    const LIN: ArtistId = ArtistId::new(1);
    const KAI: ArtistId = ArtistId::new(2);

    fn commitment(kind: CommitmentKind, id: i64, from: Option<&str>, to: Option<&str>) -> Commitment {
        Commitment {
            kind,
            related_id: id,
            title: format!("{kind} {id}"),
            start: from.map(|s| parse_bound(s, BoundSide::Start).unwrap()),
            end: to.map(|s| parse_bound(s, BoundSide::End).unwrap()),
            fallback_date: None,
            description: None,
            schedule_info: None,
        }
    }

    fn released(id: i64, day: &str) -> Commitment {
        Commitment {
            fallback_date: Some(NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap()),
            ..commitment(CommitmentKind::Project, id, None, None)
        }
    }

    fn ids(list: &[Commitment]) -> Vec<(CommitmentKind, i64)> {
        list.iter().map(|c| (c.kind, c.related_id)).collect()
    }

    fn fixture() -> MemorySource {
        let mut source = MemorySource::new();
        let _ = source
            .add(LIN, commitment(CommitmentKind::Activity, 1, Some("2024-02-10"), Some("2024-02-12")))
            .add(LIN, commitment(CommitmentKind::Project, 2, Some("2024-01-20"), Some("2024-02-02")))
            .add(LIN, released(3, "2024-03-01"))
            .add(LIN, commitment(CommitmentKind::Activity, 4, None, None));
        source
    }

    #[test]
    fn ascending_puts_unscheduled_last() {
        let list = list_schedule(&fixture(), LIN, None, SortOrder::Asc).unwrap();
        assert_eq!(
            ids(&list),
            vec![
                (CommitmentKind::Project, 2),
                (CommitmentKind::Activity, 1),
                (CommitmentKind::Project, 3),
                (CommitmentKind::Activity, 4),
            ]
        );
    }

    #[test]
    fn descending_still_puts_unscheduled_last() {
        let list = list_schedule(&fixture(), LIN, None, SortOrder::Desc).unwrap();
        assert_eq!(
            ids(&list),
            vec![
                (CommitmentKind::Project, 3),
                (CommitmentKind::Activity, 1),
                (CommitmentKind::Project, 2),
                (CommitmentKind::Activity, 4),
            ]
        );
    }

    #[test]
    fn equal_starts_tie_break_on_kind_then_id() {
        let mut source = MemorySource::new();
        let _ = source
            .add(LIN, commitment(CommitmentKind::Activity, 1, Some("2024-02-01"), None))
            .add(LIN, commitment(CommitmentKind::Project, 9, Some("2024-02-01"), None))
            .add(LIN, commitment(CommitmentKind::Project, 3, Some("2024-02-01"), None));
        let list = list_schedule(&source, LIN, None, SortOrder::Desc).unwrap();
        assert_eq!(
            ids(&list),
            vec![
                (CommitmentKind::Project, 3),
                (CommitmentKind::Project, 9),
                (CommitmentKind::Activity, 1),
            ]
        );
    }

    #[test]
    fn monthly_view_keeps_spanning_commitments() {
        let feb: Month = "2024-02".parse().unwrap();
        let list = list_monthly_schedule(&fixture(), LIN, feb).unwrap();
        // project 2 starts in January but runs into February
        assert_eq!(
            ids(&list),
            vec![(CommitmentKind::Project, 2), (CommitmentKind::Activity, 1)]
        );
    }

    #[test]
    fn leap_day_commitment_is_in_february_2024() {
        let mut source = MemorySource::new();
        let _ = source.add(LIN, released(1, "2024-02-29"));
        let feb: Month = "2024-02".parse().unwrap();
        assert_eq!(list_monthly_schedule(&source, LIN, feb).unwrap().len(), 1);
        let mar: Month = "2024-03".parse().unwrap();
        assert!(list_monthly_schedule(&source, LIN, mar).unwrap().is_empty());
    }

    #[test]
    fn listing_is_restartable() {
        let source = fixture();
        let first = list_schedule(&source, LIN, None, SortOrder::Asc).unwrap();
        let second = list_schedule(&source, LIN, None, SortOrder::Asc).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn stats_count_totals_and_month() {
        let feb: Month = "2024-02".parse().unwrap();
        let stats = schedule_stats(&fixture(), LIN, feb).unwrap();
        assert_eq!(stats.total_projects, 2);
        assert_eq!(stats.total_activities, 2);
        assert_eq!(stats.total_schedule, 4);
        assert_eq!(stats.month_projects, 1);
        assert_eq!(stats.month_activities, 1);
        assert_eq!(stats.month_schedule, 2);
    }

    #[test]
    fn overview_flags_overlaps_within_artist_only() {
        let mut source = MemorySource::new();
        let _ = source
            .add(LIN, commitment(CommitmentKind::Activity, 1, Some("2024-02-10"), Some("2024-02-12")))
            .add(LIN, released(2, "2024-02-11"))
            .add(LIN, commitment(CommitmentKind::Activity, 3, Some("2024-02-20"), Some("2024-02-20")))
            .add(KAI, commitment(CommitmentKind::Activity, 1, Some("2024-02-10"), Some("2024-02-12")));
        let artists = vec![(LIN, "Lin".to_string()), (KAI, "Kai".to_string())];
        let feb: Month = "2024-02".parse().unwrap();

        let overview = monthly_overview(&source, &artists, feb).unwrap();
        let flags: Vec<_> = overview
            .iter()
            .map(|e| (e.artist_id, e.commitment.related_id, e.has_conflict))
            .collect();
        assert_eq!(
            flags,
            vec![
                (LIN, 1, true),
                (KAI, 1, false),
                (LIN, 2, true),
                (LIN, 3, false),
            ]
        );
        assert_eq!(overview[0].artist_name, "Lin");
    }
}
