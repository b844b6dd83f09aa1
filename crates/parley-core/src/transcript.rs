//! The append-only transcript store.
//!
//! One [`Transcript`] per session, owned exclusively by that session's
//! controller. The system turn is seeded at construction and is the only
//! turn excluded from the visible/serialized views.

use crate::errors::InvalidRoleError;
use crate::text::collapse_newlines;
use crate::turn::{Role, Turn};

/// Separator between serialized turns.
///
/// This is an integration contract: the spreadsheet consumer and the
/// hosting survey page both split the serialized transcript on this exact
/// string. It must never change.
pub const TRANSCRIPT_SEPARATOR: &str = " | ";

/// Ordered, append-only log of interview turns.
///
/// Invariants:
/// - exactly one system turn, always first, seeded at construction
/// - turns are immutable once appended; insertion order is conversation
///   order
#[derive(Clone, Debug)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Create a transcript seeded with the system turn.
    #[must_use]
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::system(system_prompt)],
        }
    }

    /// Append a turn to the end of the sequence.
    ///
    /// The only rejected shape is a second system turn — everything else
    /// about turn ordering is the caller's business.
    pub fn append(&mut self, turn: Turn) -> Result<(), InvalidRoleError> {
        if turn.is_system() {
            return Err(InvalidRoleError::MisplacedSystem);
        }
        self.turns.push(turn);
        Ok(())
    }

    /// The full ordered sequence including the system turn.
    ///
    /// This is the prompt context sent to the completion gateway — and
    /// nothing else; the system turn never reaches a display, a persisted
    /// row, or a relay payload.
    #[must_use]
    pub fn all_turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The ordered sequence excluding the system turn.
    #[must_use]
    pub fn visible_turns(&self) -> &[Turn] {
        &self.turns[1..]
    }

    /// Number of visible (non-system) turns.
    #[must_use]
    pub fn visible_len(&self) -> usize {
        self.turns.len() - 1
    }

    /// Whether any visible turns exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visible_len() == 0
    }

    /// The most recent assistant turn, if any.
    #[must_use]
    pub fn last_assistant(&self) -> Option<&Turn> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::Assistant)
    }

    /// Render the visible turns as one delimited string.
    ///
    /// One entry per turn, `"<Role>: <content>"` with the role
    /// capitalized, interior newlines collapsed to single spaces, entries
    /// joined with [`TRANSCRIPT_SEPARATOR`]. Deterministic: identical turn
    /// sequences always produce identical output.
    #[must_use]
    pub fn serialize(&self) -> String {
        self.visible_turns()
            .iter()
            .map(|t| format!("{}: {}", t.role.display_name(), collapse_newlines(&t.content)))
            .collect::<Vec<_>>()
            .join(TRANSCRIPT_SEPARATOR)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
