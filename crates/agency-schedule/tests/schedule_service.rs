//! End-to-end schedule service behavior over a migrated in-memory database.

#![allow(unused_results)]

use std::sync::Arc;

use agency_core::{ActivityId, ArtistId, Caller, FixedClock, ProjectId, UserId};
use agency_schedule::{
    BoundSide, CatalogRepo, CommitmentKind, CommitmentRef, ConflictQuery, Month, NewEntity,
    ScheduleError, ScheduleService, parse_bound,
};
use agency_settings::{ScheduleSettings, SortOrder};
use agency_store::{AuditAction, AuditRepo, AuditSubject, Database, LogOrder};
use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveDateTime};

fn start(s: &str) -> NaiveDateTime {
    parse_bound(s, BoundSide::Start).unwrap()
}

fn end(s: &str) -> NaiveDateTime {
    parse_bound(s, BoundSide::End).unwrap()
}

struct Fixture {
    db: Database,
    lin: ArtistId,
    kai: ArtistId,
    album: ProjectId,
    tour: ActivityId,
    fan_meet: ActivityId,
}

fn fixture() -> Fixture {
    let db = Database::in_memory().unwrap();
    let conn = db.conn().unwrap();
    let lin = CatalogRepo::create_artist(&conn, "Lin").unwrap().id;
    let kai = CatalogRepo::create_artist(&conn, "Kai").unwrap().id;

    let album = CatalogRepo::create_project(
        &conn,
        &NewEntity {
            title: "Album".into(),
            fallback_date: NaiveDate::from_ymd_opt(2024, 2, 29),
            ..NewEntity::default()
        },
    )
    .unwrap();
    let tour = CatalogRepo::create_activity(
        &conn,
        &NewEntity {
            title: "Tour".into(),
            start: Some(start("2024-02-01")),
            end: Some(end("2024-02-05")),
            ..NewEntity::default()
        },
    )
    .unwrap();
    let fan_meet = CatalogRepo::create_activity(
        &conn,
        &NewEntity {
            title: "Fan meeting".into(),
            start: Some(start("2024-03-10 14:00")),
            end: Some(start("2024-03-10 17:00")),
            ..NewEntity::default()
        },
    )
    .unwrap();

    CatalogRepo::link_project(&conn, lin, album).unwrap();
    CatalogRepo::link_activity(&conn, lin, tour).unwrap();
    CatalogRepo::link_activity(&conn, lin, fan_meet).unwrap();
    CatalogRepo::link_activity(&conn, kai, fan_meet).unwrap();
    drop(conn);

    Fixture {
        db,
        lin,
        kai,
        album,
        tour,
        fan_meet,
    }
}

fn service(db: &Database, enforce_conflicts: bool) -> ScheduleService {
    let clock = FixedClock::new(start("2024-02-15 10:00"));
    ScheduleService::new(
        db.clone(),
        ScheduleSettings {
            enforce_conflicts,
            default_order: SortOrder::Desc,
        },
        Arc::new(clock),
    )
}

fn caller() -> Caller {
    Caller::new(UserId::new(1), "amy")
}

#[test]
fn list_schedule_uses_default_order() {
    let f = fixture();
    let svc = service(&f.db, false);
    let list = svc.list_schedule(f.lin, None, None).unwrap();
    let titles: Vec<_> = list.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Fan meeting", "Album", "Tour"]);

    let asc = svc.list_schedule(f.lin, None, Some(SortOrder::Asc)).unwrap();
    assert_eq!(asc[0].title, "Tour");
}

#[test]
fn list_schedule_unknown_artist_is_not_found() {
    let f = fixture();
    let svc = service(&f.db, false);
    assert_matches!(
        svc.list_schedule(ArtistId::new(999), None, None),
        Err(ScheduleError::NotFound(_))
    );
}

#[test]
fn monthly_schedule_handles_leap_february() {
    let f = fixture();
    let svc = service(&f.db, false);
    let feb = svc
        .list_monthly_schedule(f.lin, "2024-02".parse().unwrap())
        .unwrap();
    let titles: Vec<_> = feb.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Tour", "Album"]);
}

#[test]
fn stats_default_to_clock_month() {
    let f = fixture();
    let svc = service(&f.db, false);
    let stats = svc.schedule_stats(f.lin, None).unwrap();
    assert_eq!(stats.month, Month::new(2024, 2).unwrap());
    assert_eq!(stats.total_schedule, 3);
    assert_eq!(stats.month_schedule, 2);

    let march = svc
        .schedule_stats(f.lin, Some("2024-03".parse().unwrap()))
        .unwrap();
    assert_eq!(march.month_activities, 1);
    assert_eq!(march.month_projects, 0);
}

#[test]
fn check_conflict_with_self_exclusion() {
    let f = fixture();
    let svc = service(&f.db, false);

    let query = ConflictQuery::new(f.lin, start("2024-02-01"), end("2024-02-05")).unwrap();
    let report = svc.check_conflict(&query).unwrap();
    assert!(report.has_conflict);
    assert_eq!(report.conflicts.len(), 1);

    let excluded = query.excluding(CommitmentKind::Activity, f.tour.get());
    let report = svc.check_conflict(&excluded).unwrap();
    assert!(!report.has_conflict);
}

#[test]
fn overview_covers_all_artists() {
    let f = fixture();
    let svc = service(&f.db, false);
    let march = svc.monthly_overview(Some("2024-03".parse().unwrap())).unwrap();
    let artists: Vec<_> = march.iter().map(|e| e.artist_id).collect();
    assert_eq!(artists, vec![f.lin, f.kai]);
    assert!(march.iter().all(|e| !e.has_conflict));

    let feb = svc.monthly_overview(None).unwrap();
    assert_eq!(feb.len(), 2);
}

#[test]
fn advisory_reschedule_writes_and_reports_conflicts() {
    let f = fixture();
    let svc = service(&f.db, false);
    let target = CommitmentRef::new(CommitmentKind::Activity, f.fan_meet.get());

    let outcome = svc
        .reschedule(&caller(), target, Some(start("2024-02-29 18:00")), Some(end("2024-03-01")))
        .unwrap();
    assert!(outcome.has_conflict());
    assert_eq!(outcome.conflicts.len(), 1);
    assert_eq!(outcome.conflicts[0].artist_id, f.lin);
    assert_eq!(outcome.conflicts[0].conflicts[0].related_id, f.album.get());

    let conn = f.db.conn().unwrap();
    let stored = CatalogRepo::find_commitment(&conn, target).unwrap().unwrap();
    assert_eq!(stored.start, Some(start("2024-02-29 18:00")));

    let log = AuditRepo::list(&conn, AuditSubject::Activity, f.fan_meet.get(), LogOrder::NewestFirst)
        .unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, AuditAction::Rescheduled);
    assert_eq!(log[0].field_changed.as_deref(), Some("time_range"));
}

#[test]
fn enforced_reschedule_rolls_back_on_conflict() {
    let f = fixture();
    let svc = service(&f.db, true);
    let target = CommitmentRef::new(CommitmentKind::Activity, f.fan_meet.get());

    let err = svc
        .reschedule(&caller(), target, Some(start("2024-02-03")), Some(end("2024-02-03")))
        .unwrap_err();
    assert_matches!(err, ScheduleError::Conflict(ref report) if report.conflicts.len() == 1);

    let conn = f.db.conn().unwrap();
    let stored = CatalogRepo::find_commitment(&conn, target).unwrap().unwrap();
    assert_eq!(stored.start, Some(start("2024-03-10 14:00")));
    assert_eq!(
        AuditRepo::count(&conn, AuditSubject::Activity, f.fan_meet.get()).unwrap(),
        0
    );
}

#[test]
fn rescheduling_onto_own_range_is_not_a_conflict() {
    let f = fixture();
    let svc = service(&f.db, true);
    let target = CommitmentRef::new(CommitmentKind::Activity, f.tour.get());
    let outcome = svc
        .reschedule(&caller(), target, Some(start("2024-02-02")), Some(end("2024-02-05")))
        .unwrap();
    assert!(!outcome.has_conflict());
}

#[test]
fn reschedule_validates_input_and_target() {
    let f = fixture();
    let svc = service(&f.db, false);
    assert_matches!(
        svc.reschedule(
            &caller(),
            CommitmentRef::new(CommitmentKind::Project, 404),
            None,
            None
        ),
        Err(ScheduleError::NotFound(_))
    );
    assert_matches!(
        svc.reschedule(
            &caller(),
            CommitmentRef::new(CommitmentKind::Project, f.album.get()),
            Some(start("2024-03-02")),
            Some(start("2024-03-01")),
        ),
        Err(ScheduleError::InvalidArgument(_))
    );
}
