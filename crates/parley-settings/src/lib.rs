//! # parley-settings
//!
//! Layered configuration for the Parley interview relay.
//!
//! Settings are resolved in three layers, later layers winning:
//!
//! 1. Compiled defaults ([`ParleySettings::default`])
//! 2. `~/.parley/settings.json`, deep-merged over the defaults
//! 3. `PARLEY_*` environment variable overrides
//!
//! See [`loader`] for the merge and override rules.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, settings_path};
pub use types::{
    GatewaySettings, InterviewSettings, ParleySettings, ServerSettings, SheetsSettings,
};
