use agency_core::{ActivityId, ArtistId, ProjectId};
use agency_schedule::{CatalogRepo, NewEntity};
use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Subcommand};
use serde_json::{Value, json};

use super::{end_bound, start_bound, to_json};
use crate::app::App;

#[derive(Subcommand, Debug)]
pub enum CatalogCommand {
    /// Add an artist.
    AddArtist { name: String },
    /// Add a project.
    AddProject {
        #[command(flatten)]
        entity: EntityArgs,
        /// Release date, used when no explicit range is set.
        #[arg(long)]
        release: Option<NaiveDate>,
    },
    /// Add an activity.
    AddActivity {
        #[command(flatten)]
        entity: EntityArgs,
        /// Activity date, used when no explicit range is set.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Make an artist a member of a project.
    LinkProject {
        #[arg(long)]
        artist: ArtistId,
        #[arg(long)]
        project: ProjectId,
    },
    /// Make an artist a member of an activity.
    LinkActivity {
        #[arg(long)]
        artist: ArtistId,
        #[arg(long)]
        activity: ActivityId,
    },
}

#[derive(Args, Debug)]
pub struct EntityArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long, value_parser = start_bound)]
    start: Option<NaiveDateTime>,
    #[arg(long, value_parser = end_bound)]
    end: Option<NaiveDateTime>,
    /// Itinerary notes shown alongside the schedule.
    #[arg(long)]
    schedule_info: Option<String>,
}

impl EntityArgs {
    fn entity(&self, fallback_date: Option<NaiveDate>) -> NewEntity {
        NewEntity {
            title: self.title.clone(),
            description: self.description.clone(),
            start: self.start,
            end: self.end,
            fallback_date,
            schedule_info: self.schedule_info.clone(),
        }
    }
}

impl CatalogCommand {
    pub fn run(&self, app: &App) -> Result<Value> {
        let conn = app.db.conn()?;
        match self {
            Self::AddArtist { name } => to_json(&CatalogRepo::create_artist(&conn, name)?),
            Self::AddProject { entity, release } => {
                let id = CatalogRepo::create_project(&conn, &entity.entity(*release))?;
                Ok(json!({ "id": id }))
            }
            Self::AddActivity { entity, date } => {
                let id = CatalogRepo::create_activity(&conn, &entity.entity(*date))?;
                Ok(json!({ "id": id }))
            }
            Self::LinkProject { artist, project } => {
                CatalogRepo::link_project(&conn, *artist, *project)?;
                Ok(json!({ "artist_id": artist, "project_id": project }))
            }
            Self::LinkActivity { artist, activity } => {
                CatalogRepo::link_activity(&conn, *artist, *activity)?;
                Ok(json!({ "artist_id": artist, "activity_id": activity }))
            }
        }
    }
}
