//! Minimal catalog access: artists, projects, activities, and memberships.
//!
//! Artist and entity management belongs to the hosting application. This
//! repository covers what the schedule service itself needs (lookups,
//! membership lists, time range writes) plus inserts for seeding.

use agency_core::{ActivityId, ArtistId, ProjectId};
use agency_store::row_helpers::get;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::commitment::{Commitment, CommitmentKind, CommitmentRef};
use crate::errors::Result;
use crate::source::commitment_from_row;

/// An artist managed by the agency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    /// Row id.
    pub id: ArtistId,
    /// Display name.
    pub name: String,
}

/// Fields for a new project or activity row.
#[derive(Clone, Debug, Default)]
pub struct NewEntity {
    /// Title shown in schedules.
    pub title: String,
    /// Free text.
    pub description: Option<String>,
    /// Explicit start.
    pub start: Option<NaiveDateTime>,
    /// Explicit end.
    pub end: Option<NaiveDateTime>,
    /// Release date for projects, activity date for activities.
    pub fallback_date: Option<NaiveDate>,
    /// Itinerary notes.
    pub schedule_info: Option<String>,
}

/// Stateless catalog repository.
pub struct CatalogRepo;

impl CatalogRepo {
    /// Insert an artist.
    pub fn create_artist(conn: &Connection, name: &str) -> Result<Artist> {
        let _ = conn.execute("INSERT INTO artists (name) VALUES (?1)", params![name])?;
        Ok(Artist {
            id: ArtistId::new(conn.last_insert_rowid()),
            name: name.to_string(),
        })
    }

    /// Look up one artist.
    pub fn get_artist(conn: &Connection, id: ArtistId) -> Result<Option<Artist>> {
        let artist = conn
            .query_row(
                "SELECT id, name FROM artists WHERE id = ?1",
                params![id.get()],
                |row| Ok(artist_from_row(row)),
            )
            .optional()?
            .transpose()?;
        Ok(artist)
    }

    /// All artists by id.
    pub fn list_artists(conn: &Connection) -> Result<Vec<Artist>> {
        let mut stmt = conn.prepare("SELECT id, name FROM artists ORDER BY id")?;
        let mut rows = stmt.query([])?;
        let mut artists = Vec::new();
        while let Some(row) = rows.next()? {
            artists.push(artist_from_row(row)?);
        }
        Ok(artists)
    }

    /// Insert a project.
    pub fn create_project(conn: &Connection, project: &NewEntity) -> Result<ProjectId> {
        let _ = conn.execute(
            "INSERT INTO projects (title, description, start_date, end_date, release_date, \
             schedule_info) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project.title,
                project.description,
                project.start,
                project.end,
                project.fallback_date,
                project.schedule_info,
            ],
        )?;
        Ok(ProjectId::new(conn.last_insert_rowid()))
    }

    /// Insert an activity.
    pub fn create_activity(conn: &Connection, activity: &NewEntity) -> Result<ActivityId> {
        let _ = conn.execute(
            "INSERT INTO activities (title, description, start_date, end_date, activity_date, \
             schedule_info) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                activity.title,
                activity.description,
                activity.start,
                activity.end,
                activity.fallback_date,
                activity.schedule_info,
            ],
        )?;
        Ok(ActivityId::new(conn.last_insert_rowid()))
    }

    /// Add the artist to a project. Linking twice is a no-op.
    pub fn link_project(conn: &Connection, artist: ArtistId, project: ProjectId) -> Result<()> {
        let _ = conn.execute(
            "INSERT OR IGNORE INTO artist_projects (artist_id, project_id) VALUES (?1, ?2)",
            params![artist.get(), project.get()],
        )?;
        Ok(())
    }

    /// Add the artist to an activity. Linking twice is a no-op.
    pub fn link_activity(conn: &Connection, artist: ArtistId, activity: ActivityId) -> Result<()> {
        let _ = conn.execute(
            "INSERT OR IGNORE INTO artist_activities (artist_id, activity_id) VALUES (?1, ?2)",
            params![artist.get(), activity.get()],
        )?;
        Ok(())
    }

    /// Load one project or activity as a commitment.
    pub fn find_commitment(conn: &Connection, target: CommitmentRef) -> Result<Option<Commitment>> {
        let (sql, table) = match target.kind {
            CommitmentKind::Project => (
                "SELECT id, title, start_date, end_date, release_date, description, \
                 schedule_info FROM projects WHERE id = ?1",
                "projects",
            ),
            CommitmentKind::Activity => (
                "SELECT id, title, start_date, end_date, activity_date, description, \
                 schedule_info FROM activities WHERE id = ?1",
                "activities",
            ),
        };
        let mut stmt = conn.prepare_cached(sql)?;
        let mut rows = stmt.query(params![target.id])?;
        match rows.next()? {
            Some(row) => Ok(Some(commitment_from_row(row, target.kind, table)?)),
            None => Ok(None),
        }
    }

    /// Artists participating in a project or activity.
    pub fn members(conn: &Connection, target: CommitmentRef) -> Result<Vec<ArtistId>> {
        let sql = match target.kind {
            CommitmentKind::Project => {
                "SELECT artist_id FROM artist_projects WHERE project_id = ?1 ORDER BY artist_id"
            }
            CommitmentKind::Activity => {
                "SELECT artist_id FROM artist_activities WHERE activity_id = ?1 ORDER BY artist_id"
            }
        };
        let mut stmt = conn.prepare_cached(sql)?;
        let ids = stmt
            .query_map(params![target.id], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids.into_iter().map(ArtistId::new).collect())
    }

    /// Overwrite the explicit time range. Returns `false` if the row is missing.
    pub fn set_time_range(
        conn: &Connection,
        target: CommitmentRef,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<bool> {
        let sql = match target.kind {
            CommitmentKind::Project => "UPDATE projects SET start_date = ?1, end_date = ?2 WHERE id = ?3",
            CommitmentKind::Activity => {
                "UPDATE activities SET start_date = ?1, end_date = ?2 WHERE id = ?3"
            }
        };
        let changed = conn.execute(sql, params![start, end, target.id])?;
        Ok(changed > 0)
    }
}

fn artist_from_row(row: &rusqlite::Row<'_>) -> Result<Artist> {
    Ok(Artist {
        id: ArtistId::new(get(row, 0, "artists", "id")?),
        name: get(row, 1, "artists", "name")?,
    })
}

#[cfg(test)]
mod tests {
    use agency_store::Database;

    use super::*;

    #[test]
    fn seed_and_read_back() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();
        let lin = CatalogRepo::create_artist(&conn, "Lin").unwrap();
        let album = CatalogRepo::create_project(
            &conn,
            &NewEntity {
                title: "Album".into(),
                fallback_date: NaiveDate::from_ymd_opt(2024, 5, 20),
                schedule_info: Some("studio B, 10:00 call".into()),
                ..NewEntity::default()
            },
        )
        .unwrap();
        CatalogRepo::link_project(&conn, lin.id, album).unwrap();
        CatalogRepo::link_project(&conn, lin.id, album).unwrap();

        let target = CommitmentRef::new(CommitmentKind::Project, album.get());
        assert_eq!(CatalogRepo::members(&conn, target).unwrap(), vec![lin.id]);

        let found = CatalogRepo::find_commitment(&conn, target).unwrap().unwrap();
        assert_eq!(found.title, "Album");
        assert_eq!(found.fallback_date, NaiveDate::from_ymd_opt(2024, 5, 20));
        assert_eq!(found.schedule_info.as_deref(), Some("studio B, 10:00 call"));

        assert_eq!(CatalogRepo::get_artist(&conn, lin.id).unwrap(), Some(lin.clone()));
        assert_eq!(CatalogRepo::list_artists(&conn).unwrap(), vec![lin]);
    }

    #[test]
    fn missing_rows() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();
        let target = CommitmentRef::new(CommitmentKind::Activity, 99);
        assert!(CatalogRepo::find_commitment(&conn, target).unwrap().is_none());
        assert!(!CatalogRepo::set_time_range(&conn, target, None, None).unwrap());
        assert!(CatalogRepo::get_artist(&conn, ArtistId::new(99)).unwrap().is_none());
    }

    #[test]
    fn set_time_range_round_trips() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();
        let tour = CatalogRepo::create_activity(
            &conn,
            &NewEntity {
                title: "Tour".into(),
                ..NewEntity::default()
            },
        )
        .unwrap();
        let target = CommitmentRef::new(CommitmentKind::Activity, tour.get());
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(9, 0, 0);
        assert!(CatalogRepo::set_time_range(&conn, target, start, None).unwrap());
        let found = CatalogRepo::find_commitment(&conn, target).unwrap().unwrap();
        assert_eq!(found.start, start);
        assert_eq!(found.end, None);
    }
}
