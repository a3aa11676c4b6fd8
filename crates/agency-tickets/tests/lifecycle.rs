//! Status transitions, visibility, comments, and audit completeness.

#![allow(unused_results)]

use std::sync::Arc;

use agency_core::{Caller, Clock, FixedClock, TicketId, UserId};
use agency_settings::TicketSettings;
use agency_store::{AuditAction, Database, LogOrder};
use agency_tickets::{
    NewComment, Priority, Ticket, TicketDraft, TicketError, TicketFilter, TicketPatch,
    TicketService, TicketStatus,
};
use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate};

struct Fixture {
    svc: TicketService,
    clock: Arc<FixedClock>,
    amy: Caller,
    bo: Caller,
    cy: Caller,
    admin: Caller,
}

fn fixture() -> Fixture {
    let at = NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let clock = Arc::new(FixedClock::new(at));
    let svc = TicketService::new(
        Database::in_memory().unwrap(),
        &TicketSettings::default(),
        clock.clone(),
    )
    .unwrap();
    Fixture {
        svc,
        clock,
        amy: Caller::new(UserId::new(1), "amy"),
        bo: Caller::new(UserId::new(2), "bo"),
        cy: Caller::new(UserId::new(3), "cy"),
        admin: Caller::admin(UserId::new(9), "root"),
    }
}

fn create(f: &Fixture, caller: &Caller, title: &str, assignee: Option<&str>) -> Ticket {
    f.svc
        .create_ticket(
            caller,
            TicketDraft {
                title: title.into(),
                assigned_to: assignee.map(str::to_string),
                ..TicketDraft::default()
            },
        )
        .unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Status
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn completing_stamps_completed_at_and_reopening_clears_it() {
    let f = fixture();
    let ticket = create(&f, &f.amy, "Confirm venue", None);
    assert!(ticket.completed_at.is_none());

    f.clock.advance(Duration::hours(2));
    let done = f.svc.change_status(&f.amy, ticket.id, "completed").unwrap();
    assert_eq!(done.status, TicketStatus::Completed);
    assert_eq!(done.completed_at, Some(f.clock.now()));

    let reopened = f.svc.change_status(&f.amy, ticket.id, "reopened").unwrap();
    assert_eq!(reopened.status, TicketStatus::Reopened);
    assert!(reopened.completed_at.is_none());
}

#[test]
fn unknown_status_is_rejected_and_ticket_unchanged() {
    let f = fixture();
    let ticket = create(&f, &f.amy, "Confirm venue", None);

    assert_matches!(
        f.svc.change_status(&f.amy, ticket.id, "unknown_status"),
        Err(TicketError::InvalidTransition { .. })
    );
    assert_matches!(
        f.svc.change_status(&f.amy, ticket.id, "reopened"),
        Err(TicketError::InvalidTransition { .. })
    );

    let stored = f.svc.get_ticket(&f.amy, ticket.id).unwrap();
    assert_eq!(stored, ticket);
    let logs = f.svc.list_logs(&f.amy, ticket.id, LogOrder::NewestFirst).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, AuditAction::Created);
}

#[test]
fn missing_ticket_is_not_found() {
    let f = fixture();
    assert_matches!(
        f.svc.change_status(&f.admin, TicketId::new(404), "completed"),
        Err(TicketError::NotFound(_))
    );
    assert_matches!(
        f.svc.update_ticket(&f.admin, TicketId::new(404), TicketPatch::default()),
        Err(TicketError::NotFound(_))
    );
    assert_matches!(
        f.svc.add_comment(
            &f.admin,
            TicketId::new(404),
            &NewComment {
                content: "hello".into(),
                attachment_path: None,
            }
        ),
        Err(TicketError::NotFound(_))
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Visibility
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn non_admin_only_lists_own_or_assigned_tickets() {
    let f = fixture();
    let mine = create(&f, &f.amy, "mine", None);
    let assigned = create(&f, &f.bo, "for amy", Some("amy"));
    let foreign = create(&f, &f.bo, "bo only", Some("cy"));

    let listed = f.svc.list_tickets(&f.amy, &TicketFilter::default()).unwrap();
    let ids: Vec<_> = listed.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![assigned.id, mine.id]);
    assert!(!ids.contains(&foreign.id));

    let filtered = TicketFilter {
        status: Some(TicketStatus::Pending),
        ..TicketFilter::default()
    };
    assert!(
        f.svc
            .list_tickets(&f.amy, &filtered)
            .unwrap()
            .iter()
            .all(|t| t.id != foreign.id)
    );

    assert_eq!(f.svc.list_tickets(&f.admin, &TicketFilter::default()).unwrap().len(), 3);
}

#[test]
fn invisible_ticket_reads_as_not_found() {
    let f = fixture();
    let foreign = create(&f, &f.bo, "bo only", None);

    assert_matches!(f.svc.get_ticket(&f.cy, foreign.id), Err(TicketError::NotFound(_)));
    assert_matches!(
        f.svc.change_status(&f.cy, foreign.id, "completed"),
        Err(TicketError::NotFound(_))
    );
    assert_matches!(
        f.svc.list_comments(&f.cy, foreign.id),
        Err(TicketError::NotFound(_))
    );
    assert!(f.svc.get_ticket(&f.admin, foreign.id).is_ok());
}

#[test]
fn assignment_grants_visibility() {
    let f = fixture();
    let ticket = create(&f, &f.bo, "handoff", None);
    assert!(f.svc.get_ticket(&f.cy, ticket.id).is_err());

    let assigned = f.svc.assign(&f.bo, ticket.id, Some("cy")).unwrap();
    assert_eq!(assigned.assigned_to.as_deref(), Some("cy"));
    assert!(f.svc.get_ticket(&f.cy, ticket.id).is_ok());

    let cleared = f.svc.assign(&f.admin, ticket.id, Some("  ")).unwrap();
    assert!(cleared.assigned_to.is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Audit
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn every_mutation_appends_exactly_one_entry() {
    let f = fixture();
    let ticket = create(&f, &f.amy, "Draft contract", None);
    let count = || {
        f.svc
            .list_logs(&f.admin, ticket.id, LogOrder::OldestFirst)
            .unwrap()
            .len()
    };
    assert_eq!(count(), 1);

    f.svc
        .update_ticket(
            &f.amy,
            ticket.id,
            TicketPatch {
                title: Some("Sign contract".into()),
                priority: Some(Priority::High),
                ..TicketPatch::default()
            },
        )
        .unwrap();
    assert_eq!(count(), 2);

    f.svc.change_status(&f.amy, ticket.id, "in_progress").unwrap();
    assert_eq!(count(), 3);

    f.svc.assign(&f.amy, ticket.id, Some("bo")).unwrap();
    assert_eq!(count(), 4);

    f.svc
        .add_comment(
            &f.bo,
            ticket.id,
            &NewComment {
                content: "sent to legal".into(),
                attachment_path: None,
            },
        )
        .unwrap();
    assert_eq!(count(), 5);

    let logs = f.svc.list_logs(&f.admin, ticket.id, LogOrder::OldestFirst).unwrap();
    let actions: Vec<_> = logs.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::Created,
            AuditAction::Updated,
            AuditAction::Updated,
            AuditAction::Assigned,
            AuditAction::Commented,
        ]
    );

    let update = &logs[1];
    assert_eq!(update.field_changed.as_deref(), Some("title,priority"));
    assert_eq!(
        update.old_value.as_deref(),
        Some(r#"{"priority":"medium","title":"Draft contract"}"#)
    );
    assert_eq!(
        update.new_value.as_deref(),
        Some(r#"{"priority":"high","title":"Sign contract"}"#)
    );

    let status = &logs[2];
    assert_eq!(status.field_changed.as_deref(), Some("status"));
    assert_eq!(status.old_value.as_deref(), Some("pending"));
    assert_eq!(status.new_value.as_deref(), Some("in_progress"));

    let assign = &logs[3];
    assert_eq!(assign.old_value, None);
    assert_eq!(assign.new_value.as_deref(), Some("bo"));
    assert_eq!(logs[4].operator_name, "bo");
}

#[test]
fn no_op_update_still_logs_once_without_fields() {
    let f = fixture();
    let ticket = create(&f, &f.amy, "Same", None);
    f.svc
        .update_ticket(
            &f.amy,
            ticket.id,
            TicketPatch {
                title: Some("Same".into()),
                ..TicketPatch::default()
            },
        )
        .unwrap();
    let logs = f.svc.list_logs(&f.amy, ticket.id, LogOrder::NewestFirst).unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].action, AuditAction::Updated);
    assert!(logs[0].field_changed.is_none());
}

#[test]
fn due_date_can_be_set_then_cleared() {
    let f = fixture();
    let ticket = create(&f, &f.amy, "Book studio", None);
    let due = NaiveDate::from_ymd_opt(2024, 4, 1);

    let set = f
        .svc
        .update_ticket(
            &f.amy,
            ticket.id,
            TicketPatch {
                due_date: Some(due),
                ..TicketPatch::default()
            },
        )
        .unwrap();
    assert_eq!(set.due_date, due);

    let cleared = f
        .svc
        .update_ticket(
            &f.amy,
            ticket.id,
            TicketPatch {
                due_date: Some(None),
                ..TicketPatch::default()
            },
        )
        .unwrap();
    assert_eq!(cleared.due_date, None);
    assert_eq!(f.svc.get_ticket(&f.amy, ticket.id).unwrap().due_date, None);

    let logs = f.svc.list_logs(&f.amy, ticket.id, LogOrder::NewestFirst).unwrap();
    assert_eq!(logs[0].field_changed.as_deref(), Some("due_date"));
    assert_eq!(logs[0].old_value.as_deref(), Some(r#"{"due_date":"2024-04-01"}"#));
    assert_eq!(logs[0].new_value.as_deref(), Some(r#"{"due_date":null}"#));
}

#[test]
fn blank_comment_is_invalid_and_not_logged() {
    let f = fixture();
    let ticket = create(&f, &f.amy, "Call", None);
    assert_matches!(
        f.svc.add_comment(
            &f.amy,
            ticket.id,
            &NewComment {
                content: "  ".into(),
                attachment_path: None,
            }
        ),
        Err(TicketError::InvalidArgument(_))
    );
    assert!(f.svc.list_comments(&f.amy, ticket.id).unwrap().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Stats
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn stats_global_and_mine() {
    let f = fixture();
    create(&f, &f.amy, "a", Some("bo"));
    let urgent = f
        .svc
        .create_ticket(
            &f.amy,
            TicketDraft {
                title: "b".into(),
                ticket_type: Some("沟通".into()),
                priority: Some(Priority::Urgent),
                assigned_to: Some("bo".into()),
                ..TicketDraft::default()
            },
        )
        .unwrap();
    create(&f, &f.cy, "c", None);
    f.svc.change_status(&f.bo, urgent.id, "completed").unwrap();

    let all = f.svc.ticket_stats().unwrap();
    assert_eq!(all.total, 3);
    assert_eq!(all.by_status.get("pending"), Some(&2));
    assert_eq!(all.by_status.get("completed"), Some(&1));
    assert_eq!(all.by_type.get("communication"), Some(&3));

    let mine = f.svc.my_ticket_stats(&f.bo).unwrap();
    assert_eq!(mine.total, 2);
    assert_eq!(mine.by_priority.get("urgent"), Some(&1));
    assert_eq!(mine.by_priority.get("medium"), Some(&1));

    assert_eq!(f.svc.my_ticket_stats(&f.amy).unwrap().total, 0);
}
