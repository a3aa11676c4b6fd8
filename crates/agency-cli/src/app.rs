//! Wiring shared by every subcommand.

use std::path::Path;
use std::sync::Arc;

use agency_core::{Caller, Clock, SystemClock};
use agency_schedule::ScheduleService;
use agency_settings::{AgencySettings, resolve_database_path};
use agency_store::{ConnectionConfig, Database};
use agency_tickets::TicketService;
use anyhow::{Context, Result};
use tracing::debug;

/// Opened database plus the settings and caller for this invocation.
pub struct App {
    pub db: Database,
    pub settings: AgencySettings,
    pub caller: Caller,
    pub clock: Arc<dyn Clock>,
}

impl App {
    /// Open (and migrate) the configured database.
    pub fn open(settings: AgencySettings, home: &Path, caller: Caller) -> Result<Self> {
        let path = resolve_database_path(&settings, home);
        let db = if path.as_os_str() == ":memory:" {
            Database::in_memory().context("Failed to open in-memory database")?
        } else {
            let config = ConnectionConfig {
                pool_size: settings.database.pool_size,
                busy_timeout_ms: settings.database.busy_timeout_ms,
                ..ConnectionConfig::default()
            };
            Database::open(&path, &config)
                .with_context(|| format!("Failed to open database: {}", path.display()))?
        };
        debug!(path = %path.display(), "database ready");
        Ok(Self {
            db,
            settings,
            caller,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn schedule(&self) -> ScheduleService {
        ScheduleService::new(
            self.db.clone(),
            self.settings.schedule.clone(),
            self.clock.clone(),
        )
    }

    pub fn tickets(&self) -> Result<TicketService> {
        TicketService::new(self.db.clone(), &self.settings.tickets, self.clock.clone())
            .context("Invalid ticket settings")
    }
}
