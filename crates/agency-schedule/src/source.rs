//! Where commitments come from.
//!
//! The engine functions are generic over [`CommitmentSource`] so they can run
//! against a pooled connection, inside a write transaction, or over fixed data.

use std::collections::BTreeMap;

use agency_core::ArtistId;
use agency_store::row_helpers::{get, get_opt};
use rusqlite::{Connection, params};

use crate::commitment::{Commitment, CommitmentKind};
use crate::errors::Result;

/// Read access to an artist's commitments of one kind.
pub trait CommitmentSource {
    /// Every commitment of `kind` the artist is a member of.
    fn list_by_artist(&self, artist: ArtistId, kind: CommitmentKind) -> Result<Vec<Commitment>>;

    /// Every commitment of every kind the artist is a member of.
    fn list_all_by_artist(&self, artist: ArtistId) -> Result<Vec<Commitment>> {
        let mut all = Vec::new();
        for kind in CommitmentKind::ALL {
            all.extend(self.list_by_artist(artist, kind)?);
        }
        Ok(all)
    }
}

impl CommitmentSource for Connection {
    fn list_by_artist(&self, artist: ArtistId, kind: CommitmentKind) -> Result<Vec<Commitment>> {
        let (sql, table) = match kind {
            CommitmentKind::Project => (
                "SELECT p.id, p.title, p.start_date, p.end_date, p.release_date, p.description, \
                 p.schedule_info \
                 FROM projects p JOIN artist_projects ap ON ap.project_id = p.id \
                 WHERE ap.artist_id = ?1 ORDER BY p.id",
                "projects",
            ),
            CommitmentKind::Activity => (
                "SELECT a.id, a.title, a.start_date, a.end_date, a.activity_date, a.description, \
                 a.schedule_info \
                 FROM activities a JOIN artist_activities aa ON aa.activity_id = a.id \
                 WHERE aa.artist_id = ?1 ORDER BY a.id",
                "activities",
            ),
        };
        let mut stmt = self.prepare_cached(sql)?;
        let mut rows = stmt.query(params![artist.get()])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(commitment_from_row(row, kind, table)?);
        }
        Ok(out)
    }
}

/// Decode `id, title, start_date, end_date, <fallback>, description, schedule_info`.
pub(crate) fn commitment_from_row(
    row: &rusqlite::Row<'_>,
    kind: CommitmentKind,
    table: &'static str,
) -> Result<Commitment> {
    let fallback_column = match kind {
        CommitmentKind::Project => "release_date",
        CommitmentKind::Activity => "activity_date",
    };
    Ok(Commitment {
        kind,
        related_id: get(row, 0, table, "id")?,
        title: get(row, 1, table, "title")?,
        start: get_opt(row, 2, table, "start_date")?,
        end: get_opt(row, 3, table, "end_date")?,
        fallback_date: get_opt(row, 4, table, fallback_column)?,
        description: get_opt(row, 5, table, "description")?,
        schedule_info: get_opt(row, 6, table, "schedule_info")?,
    })
}

/// A fixed set of commitments keyed by artist.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    by_artist: BTreeMap<ArtistId, Vec<Commitment>>,
}

impl MemorySource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `artist` participates in `commitment`.
    pub fn add(&mut self, artist: ArtistId, commitment: Commitment) -> &mut Self {
        self.by_artist.entry(artist).or_default().push(commitment);
        self
    }
}

impl CommitmentSource for MemorySource {
    fn list_by_artist(&self, artist: ArtistId, kind: CommitmentKind) -> Result<Vec<Commitment>> {
        Ok(self
            .by_artist
            .get(&artist)
            .map(|all| all.iter().filter(|c| c.kind == kind).cloned().collect())
            .unwrap_or_default())
    }
}
