//! # parley-sheets
//!
//! Persistence sink for the Parley interview relay.
//!
//! After every successful exchange, the session controller hands the sink
//! one [`TranscriptRow`](sink::TranscriptRow) carrying the FULL serialized
//! transcript so far (not a delta): the external store accumulates one row
//! per exchange, each row's content a prefix of the final transcript.
//! Persistence is best-effort throughout — a sink failure is logged and
//! surfaced as a warning, never allowed to block the conversation.
//!
//! [`SheetsSink`](sheets::SheetsSink) talks to the Google Sheets
//! `values:append` API with service-account JWT auth;
//! [`MemorySink`](sink::MemorySink) keeps rows in process memory for tests
//! and sheet-less deployments.

#![deny(unsafe_code)]

pub mod auth;
pub mod sheets;
pub mod sink;

pub use auth::{ServiceAccountKey, TokenProvider};
pub use sheets::{SheetsConfig, SheetsSink};
pub use sink::{MemorySink, TranscriptRow, TranscriptSink, ROW_TIMESTAMP_FORMAT};
