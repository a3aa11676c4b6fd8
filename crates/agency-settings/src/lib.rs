//! # agency-settings
//!
//! Configuration for the agency engine, loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`AgencySettings::default()`]
//! 2. **Settings file**: `$AGENCY_HOME/settings.json` or an explicit path
//!    (deep-merged over defaults)
//! 3. **Environment variables**: `AGENCY_*` overrides (highest priority)
//!
//! The loaded value is handed to each service at construction, so tests can
//! build services from hand-made settings.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    agency_home, apply_overrides, deep_merge, load_settings, load_settings_from_path,
    resolve_database_path, settings_path,
};
pub use types::*;
