//! Ticket records, drafts, filters, and the closed status/priority sets.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use agency_core::{ArtistId, Caller, TicketId, UserId};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::TicketError;

// ─────────────────────────────────────────────────────────────────────────────
// Status
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle status of a ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Waiting to be picked up.
    Pending,
    /// Being worked on.
    InProgress,
    /// Done. Entering this status stamps `completed_at`.
    Completed,
    /// Completed or cancelled, then opened again.
    Reopened,
    /// Abandoned.
    Cancelled,
}

impl TicketStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::InProgress,
        Self::Completed,
        Self::Reopened,
        Self::Cancelled,
    ];

    /// Stored representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Reopened => "reopened",
            Self::Cancelled => "cancelled",
        }
    }

    /// Every spelling that reads as this status, stored name first.
    ///
    /// Includes the labels written by the legacy deployment, so filters
    /// can match rows that were never rewritten.
    pub fn labels(self) -> &'static [&'static str] {
        match self {
            Self::Pending => &["pending", "待处理"],
            Self::InProgress => &["in_progress", "in-progress", "处理中"],
            Self::Completed => &["completed", "已完成"],
            Self::Reopened => &["reopened"],
            Self::Cancelled => &["cancelled", "canceled"],
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = TicketError;

    /// Accepts any of [`TicketStatus::labels`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.labels().contains(&s))
            .ok_or_else(|| TicketError::invalid(format!("unknown ticket status: {s:?}")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Priority
// ─────────────────────────────────────────────────────────────────────────────

/// Ticket urgency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low.
    Low,
    /// Medium.
    Medium,
    /// High.
    High,
    /// Urgent.
    Urgent,
}

impl Priority {
    /// Every priority, lowest first.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    /// Stored representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// Every spelling that reads as this priority, stored name first.
    pub fn labels(self) -> &'static [&'static str] {
        match self {
            Self::Low => &["low", "低"],
            Self::Medium => &["medium", "中"],
            Self::High => &["high", "高"],
            Self::Urgent => &["urgent", "紧急"],
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TicketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|priority| priority.labels().contains(&s))
            .ok_or_else(|| TicketError::invalid(format!("unknown priority: {s:?}")))
    }
}

/// Legacy type labels and the names they now store as.
const LEGACY_TYPES: [(&str, &str); 1] = [("沟通", "communication")];

/// Normalize a free-form ticket type.
///
/// Types are an open set. Blank input is rejected and legacy labels such
/// as `沟通` map to their current name.
pub fn normalize_ticket_type(raw: &str) -> Result<String, TicketError> {
    match raw.trim() {
        "" => Err(TicketError::invalid("ticket type must not be empty")),
        other => Ok(LEGACY_TYPES
            .iter()
            .find(|&&(legacy, _)| legacy == other)
            .map_or(other, |&(_, current)| current)
            .to_string()),
    }
}

/// Every stored spelling of an already normalized type: the name itself
/// plus any legacy label that maps to it.
pub fn ticket_type_labels(normalized: &str) -> Vec<&str> {
    std::iter::once(normalized)
        .chain(
            LEGACY_TYPES
                .iter()
                .filter(|&&(_, current)| current == normalized)
                .map(|&(legacy, _)| legacy),
        )
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// A stored ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Row id.
    pub id: TicketId,
    /// Human-facing number, immutable once assigned.
    pub ticket_no: String,
    /// Artist the ticket concerns, if any.
    pub artist_id: Option<ArtistId>,
    /// Short summary.
    pub title: String,
    /// Free text.
    pub description: Option<String>,
    /// Open-set category such as `communication`.
    pub ticket_type: String,
    /// Urgency.
    pub priority: Priority,
    /// Lifecycle status.
    pub status: TicketStatus,
    /// User who created the ticket.
    pub creator_id: UserId,
    /// Assignee nickname.
    pub assigned_to: Option<String>,
    /// Due date.
    pub due_date: Option<NaiveDate>,
    /// Set when the ticket enters `completed`, cleared when it leaves.
    pub completed_at: Option<NaiveDateTime>,
    /// Path to an attached file.
    pub attachment_path: Option<String>,
    /// Creation time.
    pub created_at: NaiveDateTime,
    /// Last mutation time.
    pub updated_at: NaiveDateTime,
}

impl Ticket {
    /// Whether `caller` may see this ticket.
    ///
    /// Admins see everything; everyone else sees tickets they created or
    /// that are assigned to their nickname.
    pub fn is_visible_to(&self, caller: &Caller) -> bool {
        caller.is_admin
            || self.creator_id == caller.user_id
            || self.assigned_to.as_deref() == Some(caller.nickname.as_str())
    }
}

/// Fields for a new ticket. Only `title` is required.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketDraft {
    /// Artist the ticket concerns.
    pub artist_id: Option<ArtistId>,
    /// Short summary.
    pub title: String,
    /// Free text.
    pub description: Option<String>,
    /// Category. Defaults to the configured type.
    pub ticket_type: Option<String>,
    /// Urgency. Defaults to the configured priority.
    pub priority: Option<Priority>,
    /// Initial status. Defaults to `pending`.
    pub status: Option<TicketStatus>,
    /// Initial assignee nickname.
    pub assigned_to: Option<String>,
    /// Due date.
    pub due_date: Option<NaiveDate>,
    /// Attachment path.
    pub attachment_path: Option<String>,
}

/// Partial update of the editable ticket fields.
///
/// `None` leaves a field alone. For the optional text fields an empty
/// string clears the stored value; `due_date: Some(None)` (JSON `null`)
/// clears the due date.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketPatch {
    /// New title. Must not be blank.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New category.
    pub ticket_type: Option<String>,
    /// New urgency.
    pub priority: Option<Priority>,
    /// New due date, or `Some(None)` to remove it.
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    /// New attachment path.
    pub attachment_path: Option<String>,
}

/// Maps a present key to `Some`, so an explicit `null` survives as
/// `Some(None)` while a missing key falls back to the field default.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl TicketPatch {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.ticket_type.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.attachment_path.is_none()
    }
}

/// Ticket list filters. All set fields must match.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketFilter {
    /// Concerning this artist.
    pub artist_id: Option<ArtistId>,
    /// Of this type.
    pub ticket_type: Option<String>,
    /// In this status.
    pub status: Option<TicketStatus>,
    /// At this priority.
    pub priority: Option<Priority>,
    /// Assigned to this nickname.
    pub assigned_to: Option<String>,
    /// Created on or after this day.
    pub created_from: Option<NaiveDate>,
    /// Created on or before this day, inclusive of the whole day.
    pub created_to: Option<NaiveDate>,
    /// Maximum rows returned.
    pub limit: Option<u32>,
}

/// Ticket counts grouped three ways.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketStats {
    /// Tickets counted.
    pub total: u64,
    /// Counts keyed by status.
    pub by_status: BTreeMap<String, u64>,
    /// Counts keyed by type.
    pub by_type: BTreeMap<String, u64>,
    /// Counts keyed by priority.
    pub by_priority: BTreeMap<String, u64>,
}

/// A comment on a ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Row id.
    pub id: i64,
    /// Ticket commented on.
    pub ticket_id: TicketId,
    /// Author user id.
    pub commenter_id: UserId,
    /// Author nickname at the time of writing.
    pub commenter_name: String,
    /// Comment body.
    pub content: String,
    /// Attachment path.
    pub attachment_path: Option<String>,
    /// When the comment was written.
    pub created_at: NaiveDateTime,
}

/// Body of a new comment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewComment {
    /// Comment body. Must not be blank.
    pub content: String,
    /// Attachment path.
    pub attachment_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn status_parses_stored_and_legacy_names() {
        for status in TicketStatus::ALL {
            assert_eq!(status.as_str().parse::<TicketStatus>().unwrap(), status);
        }
        assert_eq!("处理中".parse::<TicketStatus>().unwrap(), TicketStatus::InProgress);
        assert_eq!("in-progress".parse::<TicketStatus>().unwrap(), TicketStatus::InProgress);
        assert_matches!("done".parse::<TicketStatus>(), Err(TicketError::InvalidArgument(_)));
    }

    #[test]
    fn priority_parses_legacy_labels() {
        assert_eq!("中".parse::<Priority>().unwrap(), Priority::Medium);
        assert_eq!("紧急".parse::<Priority>().unwrap(), Priority::Urgent);
        assert!("critical".parse::<Priority>().is_err());
    }

    #[test]
    fn ticket_type_normalization() {
        assert_eq!(normalize_ticket_type(" 沟通 ").unwrap(), "communication");
        assert_eq!(normalize_ticket_type("contract").unwrap(), "contract");
        assert!(normalize_ticket_type("  ").is_err());
    }

    #[test]
    fn labels_lead_with_stored_name_and_parse_back() {
        for status in TicketStatus::ALL {
            assert_eq!(status.labels()[0], status.as_str());
            for label in status.labels() {
                assert_eq!(label.parse::<TicketStatus>().unwrap(), status);
            }
        }
        for priority in Priority::ALL {
            assert_eq!(priority.labels()[0], priority.as_str());
            for label in priority.labels() {
                assert_eq!(label.parse::<Priority>().unwrap(), priority);
            }
        }
        assert_eq!(ticket_type_labels("communication"), vec!["communication", "沟通"]);
        assert_eq!(ticket_type_labels("contract"), vec!["contract"]);
    }

    #[test]
    fn patch_due_date_distinguishes_missing_from_null() {
        let untouched: TicketPatch = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert_eq!(untouched.due_date, None);

        let cleared: TicketPatch = serde_json::from_str(r#"{"due_date": null}"#).unwrap();
        assert_eq!(cleared.due_date, Some(None));
        assert!(!cleared.is_empty());

        let set: TicketPatch = serde_json::from_str(r#"{"due_date": "2024-04-01"}"#).unwrap();
        assert_eq!(set.due_date, Some(NaiveDate::from_ymd_opt(2024, 4, 1)));
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&TicketStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn visibility_rule() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let ticket = Ticket {
            id: TicketId::new(1),
            ticket_no: "WT202403150001".into(),
            artist_id: None,
            title: "Call venue".into(),
            description: None,
            ticket_type: "communication".into(),
            priority: Priority::Medium,
            status: TicketStatus::Pending,
            creator_id: UserId::new(1),
            assigned_to: Some("bo".into()),
            due_date: None,
            completed_at: None,
            attachment_path: None,
            created_at: at,
            updated_at: at,
        };
        assert!(ticket.is_visible_to(&Caller::new(UserId::new(1), "amy")));
        assert!(ticket.is_visible_to(&Caller::new(UserId::new(2), "bo")));
        assert!(!ticket.is_visible_to(&Caller::new(UserId::new(3), "cy")));
        assert!(ticket.is_visible_to(&Caller::admin(UserId::new(3), "cy")));
    }
}
