//! Error types shared across the Parley crates.
//!
//! - [`InvalidRoleError`]: role/transcript contract violations (programmer
//!   or data error — rejected, never coerced)
//! - [`PreconditionError`]: turn submitted outside the session state machine
//! - [`PersistenceError`]: external store failures with target and
//!   operation context
//!
//! The gateway error type lives in `parley-llm` next to the HTTP client it
//! classifies.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// InvalidRoleError
// ─────────────────────────────────────────────────────────────────────────────

/// A role or transcript-shape contract violation.
///
/// These are programmer/data errors: the operation is rejected and nothing
/// is appended.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvalidRoleError {
    /// A role string outside the three enumerated values.
    #[error("unknown role {0:?} (expected \"system\", \"user\", or \"assistant\")")]
    Unknown(String),

    /// An attempt to append a second system turn. A transcript holds
    /// exactly one system turn, always first.
    #[error("a transcript holds exactly one system turn, always first")]
    MisplacedSystem,
}

// ─────────────────────────────────────────────────────────────────────────────
// PreconditionError
// ─────────────────────────────────────────────────────────────────────────────

/// A session-state precondition violation.
///
/// The session state machine is `NOT_STARTED → STARTED → SUBMITTED`,
/// one-directional. Calls outside the valid state are rejected without
/// side effects.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PreconditionError {
    /// A turn was submitted (or `end` called) before `start`.
    #[error("session has not been started")]
    NotStarted,

    /// A turn was submitted after the session was submitted/closed.
    #[error("session has already been submitted")]
    AlreadySubmitted,

    /// The submitted turn text was empty (after trimming).
    #[error("turn text must be non-empty")]
    EmptyMessage,

    /// The transcript reached its configured turn bound.
    #[error("transcript is full ({max_turns} visible turns)")]
    TranscriptFull {
        /// The configured bound that was hit.
        max_turns: usize,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// PersistenceError
// ─────────────────────────────────────────────────────────────────────────────

/// Persistence operation kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceOperation {
    /// Appending a transcript row.
    Append,
    /// Obtaining or refreshing store credentials.
    Auth,
    /// Probing store reachability.
    Probe,
}

impl fmt::Display for PersistenceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Append => write!(f, "append"),
            Self::Auth => write!(f, "auth"),
            Self::Probe => write!(f, "probe"),
        }
    }
}

/// External store failure (store unreachable, auth failure, missing target).
///
/// Persistence is best-effort throughout Parley: callers log this error and
/// continue — it must never block or roll back an already-displayed reply.
#[derive(Debug, Error)]
#[error("persistence {operation} failed on {target}: {message}")]
pub struct PersistenceError {
    /// Spreadsheet/range or store identifier that failed.
    pub target: String,
    /// Operation that failed.
    pub operation: PersistenceOperation,
    /// Human-readable message.
    pub message: String,
    /// Machine-readable error code.
    pub code: String,
    /// Whether a retry may succeed.
    pub retryable: bool,
    /// Original cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl PersistenceError {
    /// Create a new persistence error.
    #[must_use]
    pub fn new(
        target: impl Into<String>,
        operation: PersistenceOperation,
        message: impl Into<String>,
    ) -> Self {
        let op_upper = operation.to_string().to_uppercase();
        Self {
            target: target.into(),
            operation,
            message: message.into(),
            code: format!("PERSISTENCE_{op_upper}_ERROR"),
            retryable: false,
            source: None,
        }
    }

    /// Set the error cause.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Set the retryable flag.
    #[must_use]
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Set a custom error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // -- InvalidRoleError --

    #[test]
    fn invalid_role_unknown_message() {
        let err = InvalidRoleError::Unknown("narrator".into());
        assert!(err.to_string().contains("narrator"));
        assert!(err.to_string().contains("expected"));
    }

    #[test]
    fn invalid_role_misplaced_system_message() {
        let err = InvalidRoleError::MisplacedSystem;
        assert!(err.to_string().contains("exactly one system turn"));
    }

    // -- PreconditionError --

    #[test]
    fn precondition_messages() {
        assert_eq!(
            PreconditionError::NotStarted.to_string(),
            "session has not been started"
        );
        assert_eq!(
            PreconditionError::AlreadySubmitted.to_string(),
            "session has already been submitted"
        );
        assert_eq!(
            PreconditionError::EmptyMessage.to_string(),
            "turn text must be non-empty"
        );
    }

    #[test]
    fn precondition_transcript_full_carries_bound() {
        let err = PreconditionError::TranscriptFull { max_turns: 200 };
        assert!(err.to_string().contains("200"));
    }

    // -- PersistenceError --

    #[test]
    fn persistence_error_append() {
        let err = PersistenceError::new(
            "Interview Transcripts!A:C",
            PersistenceOperation::Append,
            "store unreachable",
        );
        assert_eq!(err.code, "PERSISTENCE_APPEND_ERROR");
        assert!(!err.retryable);
        assert!(err.to_string().contains("Interview Transcripts"));
        assert!(err.to_string().contains("append"));
    }

    #[test]
    fn persistence_error_with_retryable() {
        let err = PersistenceError::new("sheet", PersistenceOperation::Append, "503")
            .with_retryable(true);
        assert!(err.retryable);
    }

    #[test]
    fn persistence_error_with_code() {
        let err = PersistenceError::new("sheet", PersistenceOperation::Auth, "expired key")
            .with_code("SHEETS_TOKEN_EXPIRED");
        assert_eq!(err.code, "SHEETS_TOKEN_EXPIRED");
    }

    #[test]
    fn persistence_error_with_source() {
        let cause = std::io::Error::new(std::io::ErrorKind::NotFound, "no credentials file");
        let err = PersistenceError::new("sheet", PersistenceOperation::Auth, "missing key file")
            .with_source(cause);
        assert!(err.source.is_some());
    }

    #[test]
    fn persistence_operation_display() {
        assert_eq!(PersistenceOperation::Append.to_string(), "append");
        assert_eq!(PersistenceOperation::Auth.to_string(), "auth");
        assert_eq!(PersistenceOperation::Probe.to_string(), "probe");
    }

    #[test]
    fn errors_are_std_error() {
        let _: &dyn std::error::Error = &InvalidRoleError::MisplacedSystem;
        let _: &dyn std::error::Error = &PreconditionError::NotStarted;
        let _: &dyn std::error::Error =
            &PersistenceError::new("t", PersistenceOperation::Probe, "m");
    }
}
