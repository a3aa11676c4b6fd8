//! Commitments: the read-only projection of projects and activities used by
//! the schedule views and conflict checks.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::errors::ScheduleError;
use crate::interval::Interval;

/// Origin of a commitment. Ordering (`Project < Activity`) is the tiebreak
/// used wherever results must be deterministic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentKind {
    /// Participation in a project; fallback date is the release date.
    Project,
    /// Participation in an activity; fallback date is the activity date.
    Activity,
}

impl CommitmentKind {
    /// Both kinds, in tiebreak order.
    pub const ALL: [CommitmentKind; 2] = [Self::Project, Self::Activity];

    /// Stored and wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Activity => "activity",
        }
    }
}

impl fmt::Display for CommitmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitmentKind {
    type Err = ScheduleError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "project" => Ok(Self::Project),
            "activity" => Ok(Self::Activity),
            other => Err(ScheduleError::invalid(format!(
                "commitment kind must be project or activity, got {other:?}"
            ))),
        }
    }
}

/// Identifies one commitment source row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommitmentRef {
    /// Project or activity.
    pub kind: CommitmentKind,
    /// Row id within that kind.
    pub id: i64,
}

impl CommitmentRef {
    /// Shorthand constructor.
    pub fn new(kind: CommitmentKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for CommitmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// One scheduled engagement of an artist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    /// Project or activity.
    pub kind: CommitmentKind,
    /// Id of the source row.
    pub related_id: i64,
    /// Source title.
    pub title: String,
    /// Explicit start, if scheduled.
    pub start: Option<NaiveDateTime>,
    /// Explicit end, if scheduled.
    pub end: Option<NaiveDateTime>,
    /// Release date (project) or activity date (activity).
    pub fallback_date: Option<NaiveDate>,
    /// Source description.
    pub description: Option<String>,
    /// Free-form itinerary notes kept with the source row.
    pub schedule_info: Option<String>,
}

impl Commitment {
    /// Reference to the source row.
    pub fn reference(&self) -> CommitmentRef {
        CommitmentRef::new(self.kind, self.related_id)
    }

    /// Range used for overlap tests and ordering.
    pub fn effective_range(&self) -> Option<Interval> {
        Interval::from_bounds(self.start, self.end, self.fallback_date)
    }

    /// Start of [`Self::effective_range`].
    pub fn effective_start(&self) -> Option<NaiveDateTime> {
        self.effective_range().map(|r| r.start())
    }
}
