//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a settings
//! file may name only the keys it wants to change.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use agency_core::logging::LogFormat;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "database": { "path": "/var/lib/agency/agency.db" },
///   "schedule": { "enforceConflicts": true },
///   "tickets": { "numberPrefix": "WT" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgencySettings {
    /// SQLite location and pool sizing.
    pub database: DatabaseSettings,
    /// Log level and output format.
    pub logging: LoggingSettings,
    /// Schedule view and conflict policy.
    pub schedule: ScheduleSettings,
    /// Ticket numbering, defaults, and status transitions.
    pub tickets: TicketSettings,
}

impl AgencySettings {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let prefix = &self.tickets.number_prefix;
        if prefix.is_empty() || prefix.len() > 8 || !prefix.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(SettingsError::InvalidValue(format!(
                "tickets.numberPrefix must be 1-8 uppercase ASCII letters, got {prefix:?}"
            )));
        }
        if self.database.pool_size == 0 {
            return Err(SettingsError::InvalidValue(
                "database.poolSize must be at least 1".to_string(),
            ));
        }
        if self.tickets.default_type.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "tickets.defaultType must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// SQLite database settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// Database file path. Relative paths resolve against the agency home.
    pub path: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
    /// How long a writer waits for the SQLite lock before failing.
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "agency.db".to_string(),
            pool_size: 8,
            busy_timeout_ms: 30_000,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// stderr output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Direction for ordering a schedule by effective start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Earliest first.
    Asc,
    /// Latest first.
    #[default]
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Schedule settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleSettings {
    /// Reject reschedules that would overlap another commitment of a member
    /// artist. When off, conflicts are reported but the write goes through.
    pub enforce_conflicts: bool,
    /// Ordering used by schedule listings that do not ask for one.
    pub default_order: SortOrder,
}

/// Ticket settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TicketSettings {
    /// Leading letters of every ticket number (`WT` in `WT202403150001`).
    pub number_prefix: String,
    /// Type assigned when a ticket is created without one.
    pub default_type: String,
    /// Priority assigned when a ticket is created without one.
    pub default_priority: String,
    /// Replacement status transition table, keyed by source status.
    /// `None` keeps the built-in table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transitions: Option<BTreeMap<String, Vec<String>>>,
}

impl Default for TicketSettings {
    fn default() -> Self {
        Self {
            number_prefix: "WT".to_string(),
            default_type: "communication".to_string(),
            default_priority: "medium".to_string(),
            transitions: None,
        }
    }
}
