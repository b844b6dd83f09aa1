//! The sink trait, the row schema, and the in-memory sink.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use parley_core::{PersistenceError, SessionId};

/// Timestamp format for persisted rows.
///
/// Part of the row contract with the spreadsheet consumer — human-sortable
/// UTC wall-clock seconds.
pub const ROW_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One persisted transcript row.
///
/// Column order is fixed once chosen: `[timestamp, session_id,
/// transcript]`. Downstream consumers address columns positionally.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptRow {
    /// Session the row belongs to.
    pub session_id: SessionId,
    /// When the row was produced (UTC).
    pub timestamp: DateTime<Utc>,
    /// The full serialized transcript accumulated so far.
    pub transcript: String,
}

impl TranscriptRow {
    /// Create a row stamped with the current time.
    #[must_use]
    pub fn new(session_id: SessionId, transcript: impl Into<String>) -> Self {
        Self {
            session_id,
            timestamp: Utc::now(),
            transcript: transcript.into(),
        }
    }

    /// The three cell values, in the fixed column order.
    #[must_use]
    pub fn to_values(&self) -> [String; 3] {
        [
            self.timestamp.format(ROW_TIMESTAMP_FORMAT).to_string(),
            self.session_id.as_str().to_owned(),
            self.transcript.clone(),
        ]
    }
}

/// Boundary to the external spreadsheet-like store.
///
/// Every successful exchange appends one row carrying the full transcript
/// so far — last-row-wins semantics for readers, not an audit log of
/// deltas. Implementations must be `Send + Sync`; one sink instance is
/// shared by every session without coordination (each row carries its own
/// session ID).
#[async_trait]
pub trait TranscriptSink: Send + Sync {
    /// Append one row. Best-effort: the caller logs failures and
    /// continues.
    async fn append_row(&self, row: &TranscriptRow) -> Result<(), PersistenceError>;
}

/// In-process sink for tests and sheet-less deployments.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Mutex<Vec<TranscriptRow>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all appended rows, in append order.
    #[must_use]
    pub fn rows(&self) -> Vec<TranscriptRow> {
        self.rows.lock().clone()
    }

    /// Number of appended rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    /// Whether no rows have been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

#[async_trait]
impl TranscriptSink for MemorySink {
    async fn append_row(&self, row: &TranscriptRow) -> Result<(), PersistenceError> {
        self.rows.lock().push(row.clone());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
