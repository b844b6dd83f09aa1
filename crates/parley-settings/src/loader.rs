//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ParleySettings::default()`]
//! 2. If `~/.parley/settings.json` exists, deep-merge user values over
//!    defaults
//! 3. Apply `PARLEY_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::ParleySettings;

/// Resolve the path to the settings file (`~/.parley/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".parley").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ParleySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<ParleySettings> {
    let defaults = serde_json::to_value(ParleySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: ParleySettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
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

/// Apply `PARLEY_*` environment variable overrides to loaded settings.
///
/// Parsing is strict: integers must be in range, booleans must be one of
/// the accepted spellings; invalid values are ignored with a warning.
pub fn apply_env_overrides(settings: &mut ParleySettings) {
    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = read_env_string("PARLEY_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u16("PARLEY_PORT", 1, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = read_env_string("PARLEY_ALLOWED_ORIGIN") {
        settings.server.allowed_origin = Some(v);
    }
    if let Some(v) = read_env_usize("PARLEY_MAX_SESSIONS", 1, 10_000) {
        settings.server.max_concurrent_sessions = v;
    }

    // ── Gateway ─────────────────────────────────────────────────────
    if let Some(v) = read_env_string("PARLEY_GATEWAY_URL") {
        settings.gateway.base_url = v;
    }
    if let Some(v) = read_env_string("PARLEY_MODEL") {
        settings.gateway.model = v;
    }
    if let Some(v) = read_env_string("PARLEY_API_KEY_ENV") {
        settings.gateway.api_key_env = v;
    }
    if let Some(v) = read_env_bool("PARLEY_STREAMING") {
        settings.gateway.streaming = v;
    }
    if let Some(v) = read_env_u64("PARLEY_GATEWAY_TIMEOUT_MS", 1000, 600_000) {
        settings.gateway.timeout_ms = v;
    }

    // ── Interview ───────────────────────────────────────────────────
    if let Some(v) = read_env_string("PARLEY_SYSTEM_PROMPT") {
        settings.interview.system_prompt = v;
    }
    if let Some(v) = read_env_usize("PARLEY_MAX_TURNS", 2, 100_000) {
        settings.interview.max_turns = v;
    }

    // ── Sheets ──────────────────────────────────────────────────────
    if let Some(v) = read_env_bool("PARLEY_SHEETS_ENABLED") {
        settings.sheets.enabled = v;
    }
    if let Some(v) = read_env_string("PARLEY_SPREADSHEET_ID") {
        settings.sheets.spreadsheet_id = v;
    }
    if let Some(v) = read_env_string("PARLEY_SHEETS_CREDENTIALS") {
        settings.sheets.credentials_path = v;
    }
    if let Some(v) = read_env_string("PARLEY_SHEETS_RANGE") {
        settings.sheets.range = v;
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

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
