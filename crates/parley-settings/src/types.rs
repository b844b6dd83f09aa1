//! Settings type tree.
//!
//! Every field carries a serde default so partial settings files merge
//! cleanly over the compiled defaults. Field names are camelCase on disk.

use std::collections::BTreeMap;

use parley_core::retry::RetryConfig;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Root
// ─────────────────────────────────────────────────────────────────────────────

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParleySettings {
    /// Settings schema version.
    pub version: Version,
    /// HTTP/WebSocket server settings.
    pub server: ServerSettings,
    /// Completion gateway settings.
    pub gateway: GatewaySettings,
    /// Interview content and bounds.
    pub interview: InterviewSettings,
    /// Spreadsheet persistence settings.
    pub sheets: SheetsSettings,
    /// Persistence retry/backoff parameters.
    pub retry: RetryConfig,
}

/// Settings schema version newtype (defaults to 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub u32);

impl Default for Version {
    fn default() -> Self {
        Self(1)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP/WebSocket server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind host.
    pub host: String,
    /// Bind port. `0` asks the OS for an ephemeral port.
    pub port: u16,
    /// The single origin allowed to open host-bridge WebSocket
    /// connections and make cross-origin requests.
    ///
    /// Required configuration for cross-origin use. When unset, only
    /// same-origin/no-`Origin` clients are accepted — there is no
    /// wildcard fallback.
    pub allowed_origin: Option<String>,
    /// Upper bound on concurrently live sessions.
    pub max_concurrent_sessions: usize,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            allowed_origin: None,
            max_concurrent_sessions: 64,
            request_timeout_ms: 120_000,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gateway
// ─────────────────────────────────────────────────────────────────────────────

/// Completion gateway settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewaySettings {
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Name of the environment variable holding the API key.
    ///
    /// Indirection keeps the key itself out of the settings file.
    pub api_key_env: String,
    /// Sampling temperature, when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum reply tokens, when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// `true` = incremental (streamed) replies, `false` = single-shot.
    pub streaming: bool,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            temperature: None,
            max_tokens: None,
            streaming: false,
            timeout_ms: 60_000,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Interview
// ─────────────────────────────────────────────────────────────────────────────

/// Interview content and bounds.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InterviewSettings {
    /// The system prompt seeded into every transcript.
    pub system_prompt: String,
    /// Optional assistant greeting shown when a session starts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub greeting: Option<String>,
    /// Bound on visible turns per session; further submissions are
    /// rejected once reached.
    pub max_turns: usize,
    /// Default session parameters, merged under caller-supplied params.
    pub default_params: BTreeMap<String, String>,
}

impl Default for InterviewSettings {
    fn default() -> Self {
        Self {
            system_prompt: "You are an interview assistant.".into(),
            greeting: None,
            max_turns: 200,
            default_params: BTreeMap::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sheets
// ─────────────────────────────────────────────────────────────────────────────

/// Spreadsheet persistence settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SheetsSettings {
    /// Whether transcript rows are persisted at all. Disabled keeps the
    /// relay fully functional with an in-memory sink.
    pub enabled: bool,
    /// Sheets API base URL.
    pub base_url: String,
    /// Target spreadsheet ID.
    pub spreadsheet_id: String,
    /// Target range in A1 notation.
    pub range: String,
    /// Path to the service-account JSON key file.
    pub credentials_path: String,
    /// Token endpoint override; defaults to the key file's `token_uri`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    /// Total append attempts (first try + retries).
    pub max_attempts: u32,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://sheets.googleapis.com".into(),
            spreadsheet_id: String::new(),
            range: "Sheet1!A:C".into(),
            credentials_path: "credentials.json".into(),
            token_uri: None,
            max_attempts: 3,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
