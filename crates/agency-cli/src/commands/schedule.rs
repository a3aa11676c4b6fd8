use agency_core::ArtistId;
use agency_schedule::{CommitmentKind, CommitmentRef, ConflictQuery, Interval, Month};
use agency_settings::SortOrder;
use anyhow::{Result, bail};
use chrono::NaiveDateTime;
use clap::Subcommand;
use serde_json::Value;

use super::{end_bound, start_bound, to_json};
use crate::app::App;

#[derive(Subcommand, Debug)]
pub enum ScheduleCommand {
    /// An artist's merged schedule.
    List {
        #[arg(long)]
        artist: ArtistId,
        /// Only commitments overlapping a range starting here.
        #[arg(long, value_parser = start_bound, requires = "to")]
        from: Option<NaiveDateTime>,
        /// Range end, inclusive.
        #[arg(long, value_parser = end_bound, requires = "from")]
        to: Option<NaiveDateTime>,
        /// `asc` or `desc`; defaults to the configured order.
        #[arg(long)]
        order: Option<SortOrder>,
    },
    /// One artist's commitments in a calendar month.
    Month {
        #[arg(long)]
        artist: ArtistId,
        /// `YYYY-MM`.
        #[arg(long)]
        month: Month,
    },
    /// Commitment counts, overall and for a month.
    Stats {
        #[arg(long)]
        artist: ArtistId,
        /// `YYYY-MM`; defaults to the current month.
        #[arg(long)]
        month: Option<Month>,
    },
    /// Every artist's commitments in a month, with conflict flags.
    Overview {
        /// `YYYY-MM`; defaults to the current month.
        #[arg(long)]
        month: Option<Month>,
    },
    /// Check a candidate range against an artist's commitments.
    Check {
        #[arg(long)]
        artist: ArtistId,
        #[arg(long, value_parser = start_bound)]
        start: NaiveDateTime,
        #[arg(long, value_parser = end_bound)]
        end: NaiveDateTime,
        /// Ignore this project (when editing it).
        #[arg(long, conflicts_with = "exclude_activity")]
        exclude_project: Option<i64>,
        /// Ignore this activity (when editing it).
        #[arg(long)]
        exclude_activity: Option<i64>,
    },
    /// Replace a project's or activity's time range.
    Reschedule {
        #[arg(long, conflicts_with = "activity", required_unless_present = "activity")]
        project: Option<i64>,
        #[arg(long)]
        activity: Option<i64>,
        /// New start; omit to clear.
        #[arg(long, value_parser = start_bound)]
        start: Option<NaiveDateTime>,
        /// New end; omit to clear.
        #[arg(long, value_parser = end_bound)]
        end: Option<NaiveDateTime>,
    },
}

impl ScheduleCommand {
    pub fn run(&self, app: &App) -> Result<Value> {
        let svc = app.schedule();
        match *self {
            Self::List {
                artist,
                from,
                to,
                order,
            } => {
                let range = match (from, to) {
                    (Some(from), Some(to)) => Some(Interval::try_new(from, to)?),
                    _ => None,
                };
                to_json(&svc.list_schedule(artist, range, order)?)
            }
            Self::Month { artist, month } => to_json(&svc.list_monthly_schedule(artist, month)?),
            Self::Stats { artist, month } => to_json(&svc.schedule_stats(artist, month)?),
            Self::Overview { month } => to_json(&svc.monthly_overview(month)?),
            Self::Check {
                artist,
                start,
                end,
                exclude_project,
                exclude_activity,
            } => {
                let mut query = ConflictQuery::new(artist, start, end)?;
                if let Some(id) = exclude_project {
                    query = query.excluding(CommitmentKind::Project, id);
                }
                if let Some(id) = exclude_activity {
                    query = query.excluding(CommitmentKind::Activity, id);
                }
                to_json(&svc.check_conflict(&query)?)
            }
            Self::Reschedule {
                project,
                activity,
                start,
                end,
            } => {
                let target = match (project, activity) {
                    (Some(id), None) => CommitmentRef::new(CommitmentKind::Project, id),
                    (None, Some(id)) => CommitmentRef::new(CommitmentKind::Activity, id),
                    _ => bail!("pass exactly one of --project or --activity"),
                };
                to_json(&svc.reschedule(&app.caller, target, start, end)?)
            }
        }
    }
}
