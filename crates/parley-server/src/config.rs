//! Server configuration and per-session defaults.

use std::collections::BTreeMap;

use parley_runtime::ControllerConfig;

/// Network-facing server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port. `0` asks the OS for an ephemeral port.
    pub port: u16,
    /// The single origin allowed for cross-origin requests and
    /// host-bridge WebSocket upgrades. Unset means same-origin /
    /// no-`Origin` clients only.
    pub allowed_origin: Option<String>,
    /// Upper bound on concurrently live sessions.
    pub max_concurrent_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            allowed_origin: None,
            max_concurrent_sessions: 64,
        }
    }
}

/// Defaults applied to every new session.
#[derive(Clone, Debug)]
pub struct SessionDefaults {
    /// System prompt seeded into each transcript.
    pub system_prompt: String,
    /// Display-only greeting returned from the first `start`.
    pub greeting: Option<String>,
    /// Bound on visible turns per session.
    pub max_turns: usize,
    /// `true` = streamed completions, `false` = single-shot.
    pub streaming: bool,
    /// Parameters merged under caller-supplied params (caller wins).
    pub default_params: BTreeMap<String, String>,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            system_prompt: "You are an interview assistant.".into(),
            greeting: None,
            max_turns: 200,
            streaming: false,
            default_params: BTreeMap::new(),
        }
    }
}

impl SessionDefaults {
    /// The controller config these defaults imply.
    #[must_use]
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            streaming: self.streaming,
            max_turns: self.max_turns,
            greeting: self.greeting.clone(),
        }
    }

    /// Merge caller-supplied params over the defaults (caller wins).
    #[must_use]
    pub fn merged_params(&self, supplied: BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut merged = self.default_params.clone();
        merged.extend(supplied);
        merged
    }
}
