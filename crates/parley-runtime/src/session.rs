//! The session: one end-to-end interview run.

use std::collections::BTreeMap;

use parley_core::{SessionId, Transcript};
use serde::{Deserialize, Serialize};

/// Session parameter echoed back in relay payloads as the correlation ID.
pub const ECHO_PARAM: &str = "Q_E_ID";

/// Session lifecycle state. One-directional, no transition back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, not yet accepting turns.
    NotStarted,
    /// Accepting turns.
    Started,
    /// Terminal: the interview was submitted; no further turns.
    Submitted,
}

/// One interactive interview run.
///
/// Owns its transcript exclusively; created when the interactive session
/// begins and destroyed with it — sessions are never reloaded from the
/// persistence sink.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    params: BTreeMap<String, String>,
    transcript: Transcript,
    state: SessionState,
}

impl Session {
    /// Create a session with a fresh ID, seeding the transcript with the
    /// system prompt.
    #[must_use]
    pub fn new(system_prompt: impl Into<String>, params: BTreeMap<String, String>) -> Self {
        Self {
            id: SessionId::new(),
            params,
            transcript: Transcript::new(system_prompt),
            state: SessionState::NotStarted,
        }
    }

    /// The session's stable identifier.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// All inbound session parameters (read-only after creation).
    #[must_use]
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// One parameter by key.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The external correlation ID ([`ECHO_PARAM`]), if supplied.
    #[must_use]
    pub fn echo_id(&self) -> Option<&str> {
        self.param(ECHO_PARAM)
    }

    /// The transcript store.
    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Mutable transcript access for the controller.
    pub(crate) fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    /// State transition, controller-only.
    pub(crate) fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
