//! # agency
//!
//! Command-line front end: loads settings, opens the database, runs one
//! schedule, ticket, or catalog command, and prints the result as JSON.

#![deny(unsafe_code)]

mod app;
mod commands;

use std::path::PathBuf;

use agency_core::logging::{LogFormat, init_subscriber};
use agency_core::{Caller, UserId};
use agency_settings::{AgencySettings, agency_home, load_settings_from_path, settings_path};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use crate::app::App;
use crate::commands::{CatalogCommand, ScheduleCommand, TicketCommand};

/// Agency scheduling and ticket tracking.
#[derive(Parser, Debug)]
#[command(name = "agency", about = "Agency scheduling and ticket tracking")]
struct Cli {
    /// Settings file (default: `<agency home>/settings.json`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database path, overriding settings and environment.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Log filter directive, e.g. `debug` or `agency_tickets=trace`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format.
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(flatten)]
    caller: CallerArgs,

    #[command(subcommand)]
    command: Command,
}

/// Identity the command runs as.
#[derive(Args, Debug)]
struct CallerArgs {
    /// Acting user id.
    #[arg(long, global = true, default_value_t = 0)]
    user_id: i64,

    /// Acting user nickname. Tickets are assigned by nickname.
    #[arg(long, global = true, default_value = "")]
    nickname: String,

    /// Act with admin visibility.
    #[arg(long, global = true)]
    admin: bool,
}

impl CallerArgs {
    fn caller(&self) -> Caller {
        let user = UserId::new(self.user_id);
        if self.admin {
            Caller::admin(user, self.nickname.clone())
        } else {
            Caller::new(user, self.nickname.clone())
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Artist schedules and conflict checks.
    #[command(subcommand)]
    Schedule(ScheduleCommand),
    /// Work tickets.
    #[command(subcommand)]
    Ticket(TicketCommand),
    /// Seed artists, projects, activities, and memberships.
    #[command(subcommand)]
    Catalog(CatalogCommand),
    /// Apply pending migrations and report the schema version.
    Migrate,
}

fn load(cli: &Cli) -> Result<AgencySettings> {
    let path = cli.config.clone().unwrap_or_else(settings_path);
    let mut settings = load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    if let Some(ref db) = cli.db {
        settings.database.path.clone_from(db);
    }
    if let Some(ref level) = cli.log_level {
        settings.logging.level.clone_from(level);
    }
    if let Some(format) = cli.log_format {
        settings.logging.format = format;
    }
    Ok(settings)
}

fn run(cli: &Cli, settings: AgencySettings) -> Result<Value> {
    let app = App::open(settings, &agency_home(), cli.caller.caller())?;
    match cli.command {
        Command::Schedule(ref cmd) => cmd.run(&app),
        Command::Ticket(ref cmd) => cmd.run(&app),
        Command::Catalog(ref cmd) => cmd.run(&app),
        Command::Migrate => Ok(serde_json::json!({
            "path": app.db.path().display().to_string(),
            "schema_version": app.db.schema_version()?,
            "pragmas": app.db.pragmas()?,
        })),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load(&cli)?;
    init_subscriber(&settings.logging.level, settings.logging.format);

    let output = run(&cli, settings)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
