//! The session controller.
//!
//! Orchestrates one turn end to end: precondition checks, user-turn
//! append, completion request (single-shot or streamed), assistant-turn
//! append, then best-effort persistence and relay. Gateway failures are
//! converted into a visible assistant-role placeholder turn — the
//! conversation continues and the placeholder is a real transcript turn,
//! flowing to the sink and bridge like any other.

use std::sync::Arc;

use futures::StreamExt;
use parley_core::{InvalidRoleError, PreconditionError, Turn};
use parley_llm::{CompletionProvider, GatewayError};
use parley_sheets::{TranscriptRow, TranscriptSink};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::relay::{HostRelayPayload, TranscriptRelay};
use crate::session::{Session, SessionState};

/// Errors surfaced by controller operations.
///
/// Gateway and persistence failures never appear here: the former become
/// visible placeholder turns, the latter non-blocking warnings in the
/// [`TurnOutcome`].
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Call made outside the valid session state, or with empty text.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// Transcript contract violation.
    #[error(transparent)]
    InvalidRole(#[from] InvalidRoleError),
}

/// Controller behavior knobs, resolved from settings at construction.
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// `true` = streamed completions, `false` = single-shot.
    pub streaming: bool,
    /// Bound on visible turns per session.
    pub max_turns: usize,
    /// Display-only greeting returned from the first `start()`.
    /// Not a transcript turn.
    pub greeting: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            streaming: false,
            max_turns: 200,
            greeting: None,
        }
    }
}

/// What one `submit_user_turn` produced.
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    /// The assistant reply shown to the participant (possibly a
    /// placeholder or truncated).
    pub reply: String,
    /// `true` when a streamed reply was cut off mid-delivery and the
    /// partial content was kept.
    pub truncated: bool,
    /// Human-readable gateway failure, when one occurred.
    pub gateway_error: Option<String>,
    /// Human-readable persistence failure, when one occurred. Never
    /// blocks the reply.
    pub persistence_warning: Option<String>,
}

/// Visible placeholder content appended when the gateway fails outright.
fn error_placeholder(cause: &GatewayError) -> String {
    format!("[interview assistant unavailable: {cause}]")
}

/// Orchestrates one session against shared gateway, sink, and relay
/// handles.
///
/// All operations take `&mut self`: the server serializes access per
/// session (input is rejected while a completion is outstanding), so at
/// most one turn is in flight per session at any time.
pub struct SessionController {
    session: Session,
    provider: Arc<dyn CompletionProvider>,
    sink: Arc<dyn TranscriptSink>,
    relay: Arc<dyn TranscriptRelay>,
    config: ControllerConfig,
}

impl SessionController {
    /// Create a controller owning `session`.
    #[must_use]
    pub fn new(
        session: Session,
        provider: Arc<dyn CompletionProvider>,
        sink: Arc<dyn TranscriptSink>,
        relay: Arc<dyn TranscriptRelay>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            session,
            provider,
            sink,
            relay,
            config,
        }
    }

    /// The owned session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Open the turn gate: `NOT_STARTED → STARTED`, exactly once.
    ///
    /// Returns the display-only greeting on the transition, `None` when
    /// already started (a no-op). Rejected once the session is submitted.
    pub fn start(&mut self) -> Result<Option<String>, PreconditionError> {
        match self.session.state() {
            SessionState::NotStarted => {
                self.session.set_state(SessionState::Started);
                info!(session_id = %self.session.id(), "session started");
                Ok(self.config.greeting.clone())
            }
            SessionState::Started => Ok(None),
            SessionState::Submitted => Err(PreconditionError::AlreadySubmitted),
        }
    }

    /// Submit one user turn and obtain the assistant reply.
    ///
    /// Requires a started, unsubmitted session and non-empty text; on any
    /// precondition violation nothing is appended. The reply is always
    /// returned for display, even when it is an error placeholder or a
    /// truncated stream.
    pub async fn submit_user_turn(&mut self, text: &str) -> Result<TurnOutcome, ControllerError> {
        match self.session.state() {
            SessionState::NotStarted => return Err(PreconditionError::NotStarted.into()),
            SessionState::Submitted => return Err(PreconditionError::AlreadySubmitted.into()),
            SessionState::Started => {}
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(PreconditionError::EmptyMessage.into());
        }
        // Both the user and assistant turn must fit under the bound.
        if self.session.transcript().visible_len() + 2 > self.config.max_turns {
            return Err(PreconditionError::TranscriptFull {
                max_turns: self.config.max_turns,
            }
            .into());
        }

        self.session.transcript_mut().append(Turn::user(text))?;

        // Owned copy: the request outlives any transcript borrow.
        let history: Vec<Turn> = self.session.transcript().all_turns().to_vec();
        let (reply, truncated, gateway_error) = if self.config.streaming {
            self.request_streamed(&history).await
        } else {
            self.request_single_shot(&history).await
        };

        self.session
            .transcript_mut()
            .append(Turn::assistant(reply.clone()))?;

        let persistence_warning = self.persist_transcript().await;
        self.relay
            .relay(&HostRelayPayload::from_session(&self.session, false))
            .await;

        Ok(TurnOutcome {
            reply,
            truncated,
            gateway_error,
            persistence_warning,
        })
    }

    /// Close the session: `STARTED → SUBMITTED`, firing one final relay
    /// with the completion flag set.
    ///
    /// Idempotent — a second call performs no state change and no
    /// additional relay, but still returns the confirmation.
    pub async fn end(&mut self) -> Result<String, PreconditionError> {
        match self.session.state() {
            SessionState::NotStarted => Err(PreconditionError::NotStarted),
            SessionState::Submitted => Ok(CONFIRMATION.to_owned()),
            SessionState::Started => {
                self.session.set_state(SessionState::Submitted);
                info!(session_id = %self.session.id(), "session submitted");
                self.relay
                    .relay(&HostRelayPayload::from_session(&self.session, true))
                    .await;
                Ok(CONFIRMATION.to_owned())
            }
        }
    }

    /// Single-shot request: `(reply, truncated, gateway_error)`.
    async fn request_single_shot(
        &self,
        history: &[Turn],
    ) -> (String, bool, Option<String>) {
        match self.provider.complete(history).await {
            Ok(reply) => (reply, false, None),
            Err(e) => {
                warn!(session_id = %self.session.id(), category = e.category(), error = %e, "completion failed");
                (error_placeholder(&e), false, Some(e.to_string()))
            }
        }
    }

    /// Streamed request: concatenate fragments in delivery order; a
    /// mid-stream failure keeps the partial content as the final
    /// (truncated) reply rather than discarding it.
    async fn request_streamed(&self, history: &[Turn]) -> (String, bool, Option<String>) {
        let mut stream = match self.provider.stream(history).await {
            Ok(s) => s,
            Err(e) => {
                warn!(session_id = %self.session.id(), category = e.category(), error = %e, "stream request failed");
                return (error_placeholder(&e), false, Some(e.to_string()));
            }
        };

        let mut content = String::new();
        let mut failure: Option<GatewayError> = None;
        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) => content.push_str(&fragment),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        match failure {
            None => (content, false, None),
            Some(e) => {
                warn!(
                    session_id = %self.session.id(),
                    partial_chars = content.len(),
                    error = %e,
                    "stream ended early"
                );
                if content.is_empty() {
                    (error_placeholder(&e), false, Some(e.to_string()))
                } else {
                    (content, true, Some(e.to_string()))
                }
            }
        }
    }

    /// Best-effort append of the full transcript so far. Returns a
    /// warning string on failure instead of an error.
    async fn persist_transcript(&self) -> Option<String> {
        let row = TranscriptRow::new(
            self.session.id().clone(),
            self.session.transcript().serialize(),
        );
        match self.sink.append_row(&row).await {
            Ok(()) => {
                debug!(session_id = %self.session.id(), "transcript persisted");
                None
            }
            Err(e) => {
                warn!(session_id = %self.session.id(), error = %e, "transcript persistence failed");
                Some(e.to_string())
            }
        }
    }
}

/// User-facing confirmation returned by `end()`.
const CONFIRMATION: &str = "Interview submitted. Thank you for participating.";

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
