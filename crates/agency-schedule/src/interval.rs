//! Closed time intervals, calendar months, and bound parsing.
//!
//! An [`Interval`] is always well-formed (`start <= end`). Missing bounds are
//! resolved against a fallback day before an interval exists at all; there is
//! no open-ended interval. Overlap is inclusive: ranges that touch conflict.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ScheduleError};

/// Closed interval `[start, end]` with `start <= end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Interval {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl Interval {
    /// Build from caller input, rejecting `start > end`.
    pub fn try_new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if start > end {
            return Err(ScheduleError::invalid(format!(
                "range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Build from stored data. A reversed range collapses to zero width at `start`.
    pub fn normalized(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        if start > end {
            Self { start, end: start }
        } else {
            Self { start, end }
        }
    }

    /// Zero-width interval at `at`.
    pub fn point(at: NaiveDateTime) -> Self {
        Self { start: at, end: at }
    }

    /// The whole of `day`: `[day 00:00:00, day 23:59:59]`.
    pub fn day(day: NaiveDate) -> Self {
        Self {
            start: day.and_time(NaiveTime::MIN),
            end: end_of_day(day),
        }
    }

    /// Resolve optional bounds against an optional fallback day.
    ///
    /// A missing start takes the fallback day's first second and a missing end
    /// its last second. If a bound is still missing it mirrors the other one.
    /// Returns `None` only when nothing at all is known.
    pub fn from_bounds(
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
        fallback: Option<NaiveDate>,
    ) -> Option<Self> {
        let start = start.or_else(|| fallback.map(|d| d.and_time(NaiveTime::MIN)));
        let end = end.or_else(|| fallback.map(end_of_day));
        match (start, end) {
            (Some(s), Some(e)) => Some(Self::normalized(s, e)),
            (Some(s), None) => Some(Self::point(s)),
            (None, Some(e)) => Some(Self::point(e)),
            (None, None) => None,
        }
    }

    /// Inclusive start.
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Inclusive end.
    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Whether the two intervals share at least one instant.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start <= other.end && self.end >= other.start
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Free-function form of [`Interval::overlaps`].
pub fn overlaps(a: &Interval, b: &Interval) -> bool {
    a.overlaps(b)
}

fn end_of_day(day: NaiveDate) -> NaiveDateTime {
    // 23:59:59 is always a valid time
    day.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
}

// ─────────────────────────────────────────────────────────────────────────────
// Months
// ─────────────────────────────────────────────────────────────────────────────

/// A calendar month, written `YYYY-MM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    first: NaiveDate,
}

impl Month {
    /// The month with the given year and 1-based month number.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|first| Self { first })
            .ok_or_else(|| ScheduleError::invalid(format!("invalid month: {year}-{month:02}")))
    }

    /// The month containing `day`.
    pub fn containing(day: NaiveDate) -> Self {
        Self {
            first: day.with_day(1).unwrap_or(day),
        }
    }

    /// First calendar day.
    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    /// Last calendar day (28 to 31, leap-year aware).
    pub fn last_day(&self) -> NaiveDate {
        self.first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(self.first)
    }

    /// `[first day 00:00:00, last day 23:59:59]`.
    pub fn interval(&self) -> Interval {
        Interval {
            start: self.first.and_time(NaiveTime::MIN),
            end: end_of_day(self.last_day()),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.first.year(), self.first.month())
    }
}

impl FromStr for Month {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || ScheduleError::invalid(format!("month must be YYYY-MM, got {s:?}"));
        let (year, month) = s.trim().split_once('-').ok_or_else(bad)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(bad());
        }
        let year: i32 = year.parse().map_err(|_| bad())?;
        let month: u32 = month.parse().map_err(|_| bad())?;
        Self::new(year, month).map_err(|_| bad())
    }
}

impl Serialize for Month {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bound parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Which end of a range a textual bound describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundSide {
    /// A bare date means the start of that day.
    Start,
    /// A bare date means the last second of that day.
    End,
}

/// Parse `YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS]`, or the `T`-separated form.
pub fn parse_bound(raw: &str, side: BoundSide) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt);
        }
    }
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ScheduleError::invalid(format!("malformed date: {raw:?}")))?;
    Ok(match side {
        BoundSide::Start => day.and_time(NaiveTime::MIN),
        BoundSide::End => end_of_day(day),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
