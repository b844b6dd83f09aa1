//! Retry configuration and backoff math.
//!
//! Portable, sync-only building blocks: the async sleep-and-retry loop
//! lives next to the HTTP adapters that use it (`parley-sheets`), while
//! this module owns the parameters and the arithmetic.

use serde::{Deserialize, Serialize};

/// Default maximum retries.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default base delay in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;
/// Default maximum delay in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 15_000;
/// Default jitter factor (0.0–1.0).
pub const DEFAULT_JITTER_FACTOR: f64 = 0.2;

/// Parameters for the bounded best-effort retry loop.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential backoff in ms.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Cap on the delay between attempts in ms.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Jitter range 0.0–1.0 applied symmetrically around the backoff value.
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}
fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}
fn default_jitter_factor() -> f64 {
    DEFAULT_JITTER_FACTOR
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter_factor: DEFAULT_JITTER_FACTOR,
        }
    }
}

/// Exponential backoff delay for a zero-based `attempt`, with jitter.
///
/// Formula: `min(max_delay, base_delay * 2^attempt) * (1 + (random*2 - 1) * jitter)`
/// where `random` is a value in `[0.0, 1.0)` supplied by the caller —
/// keeping this function pure and testable.
#[must_use]
pub fn backoff_delay_ms(attempt: u32, config: &RetryConfig, random: f64) -> u64 {
    let exponential = config
        .base_delay_ms
        .saturating_mul(1u64 << attempt.min(31));
    let capped = exponential.min(config.max_delay_ms);

    // Maps random [0,1) to a [-jitter, +jitter] multiplier
    let jitter = 1.0 + (random * 2.0 - 1.0) * config.jitter_factor;
    ((capped as f64) * jitter).round().max(0.0) as u64
}

/// Parse a `Retry-After` HTTP header value into milliseconds.
///
/// Accepts either delta-seconds (`"120"`) or an HTTP-date; a date in the
/// past yields `Some(0)`, unparseable input yields `None`.
#[must_use]
pub fn parse_retry_after_ms(value: &str) -> Option<u64> {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(seconds * 1000);
    }

    let date = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let delay_ms = date
        .signed_duration_since(chrono::Utc::now())
        .num_milliseconds();
    Some(if delay_ms > 0 { delay_ms as u64 } else { 0 })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
