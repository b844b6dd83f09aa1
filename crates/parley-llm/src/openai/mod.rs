//! OpenAI-compatible chat-completions provider.
//!
//! Split into `types` (wire format) and `provider` (request building,
//! error classification, and the single-shot/streaming entry points).

pub mod provider;
pub mod types;

pub use provider::{OpenAiConfig, OpenAiProvider};
