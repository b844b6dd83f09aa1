//! Turn types for the interview conversation model.
//!
//! A [`Turn`] is one role-tagged utterance. Three roles: the single
//! `system` turn that opens every transcript, and the alternating
//! `user`/`assistant` turns of the interview itself.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::InvalidRoleError;

// ─────────────────────────────────────────────────────────────────────────────
// Role
// ─────────────────────────────────────────────────────────────────────────────

/// Speaker of a turn.
///
/// Serialized lowercase on the wire (`"system"`, `"user"`, `"assistant"`),
/// which is also what the completion API expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The interview instructions. Exactly one per transcript, never shown.
    System,
    /// The participant.
    User,
    /// The interview assistant.
    Assistant,
}

impl Role {
    /// Capitalized form used in serialized transcripts (`"User: ..."`).
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::System => "System",
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }

    /// Lowercase wire form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = InvalidRoleError;

    /// Parse a lowercase wire role. Anything outside the three enumerated
    /// values is a contract violation, not something to coerce.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(InvalidRoleError::Unknown(other.to_owned())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Turn
// ─────────────────────────────────────────────────────────────────────────────

/// One utterance in an interview. Immutable once appended to a transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    /// Who spoke.
    pub role: Role,
    /// What was said.
    pub content: String,
    /// When the turn was recorded (UTC).
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a turn with the current timestamp.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a system turn.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Returns `true` for the system turn.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
