//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`AgencySettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply `AGENCY_*` environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::AgencySettings;

/// Resolve the agency home directory: `$AGENCY_HOME`, else `~/.agency`.
pub fn agency_home() -> PathBuf {
    if let Some(home) = std::env::var("AGENCY_HOME").ok().filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".agency")
}

/// Resolve the path to the settings file (`<agency home>/settings.json`).
pub fn settings_path() -> PathBuf {
    agency_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<AgencySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON or the merged values fail validation, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<AgencySettings> {
    let mut settings = merge_file(path)?;
    apply_overrides(&mut settings, |name| std::env::var(name).ok());
    settings.validate()?;
    Ok(settings)
}

/// Defaults with the settings file (if any) merged on top.
fn merge_file(path: &Path) -> Result<AgencySettings> {
    let defaults = serde_json::to_value(AgencySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `AGENCY_*` overrides read through `lookup`.
///
/// Invalid values are ignored with a warning (fall back to file/default).
pub fn apply_overrides<F>(settings: &mut AgencySettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    // ── Database ────────────────────────────────────────────────────
    if let Some(v) = read("AGENCY_DB_PATH") {
        settings.database.path = v;
    }
    if let Some(v) = read("AGENCY_DB_POOL_SIZE") {
        match parse_u32_range(&v, 1, 64) {
            Some(n) => settings.database.pool_size = n,
            None => warn!(key = "AGENCY_DB_POOL_SIZE", value = %v, "invalid pool size env var, ignoring"),
        }
    }
    if let Some(v) = read("AGENCY_DB_BUSY_TIMEOUT_MS") {
        match parse_u32_range(&v, 100, 600_000) {
            Some(n) => settings.database.busy_timeout_ms = n,
            None => warn!(key = "AGENCY_DB_BUSY_TIMEOUT_MS", value = %v, "invalid busy timeout env var, ignoring"),
        }
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read("AGENCY_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("AGENCY_LOG_FORMAT") {
        match v.parse() {
            Ok(format) => settings.logging.format = format,
            Err(_) => warn!(key = "AGENCY_LOG_FORMAT", value = %v, "invalid log format env var, ignoring"),
        }
    }

    // ── Schedule ────────────────────────────────────────────────────
    if let Some(v) = read("AGENCY_ENFORCE_CONFLICTS") {
        match parse_bool(&v) {
            Some(b) => settings.schedule.enforce_conflicts = b,
            None => warn!(key = "AGENCY_ENFORCE_CONFLICTS", value = %v, "invalid boolean env var, ignoring"),
        }
    }

    // ── Tickets ─────────────────────────────────────────────────────
    if let Some(v) = read("AGENCY_TICKET_PREFIX") {
        settings.tickets.number_prefix = v;
    }
}

/// Resolve the configured database path against the agency home.
///
/// Absolute paths and `:memory:` are returned unchanged.
pub fn resolve_database_path(settings: &AgencySettings, home: &Path) -> PathBuf {
    let raw = Path::new(&settings.database.path);
    if raw.is_absolute() || settings.database.path == ":memory:" {
        raw.to_path_buf()
    } else {
        home.join(raw)
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
