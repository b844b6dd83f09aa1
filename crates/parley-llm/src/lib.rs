//! # parley-llm
//!
//! Completion gateway for the Parley interview relay.
//!
//! The [`CompletionProvider`](provider::CompletionProvider) trait is the
//! boundary to the external language-model service: callers hand it the
//! full turn history (system turn included) and get back either one reply
//! string (single-shot) or a lazy fragment stream (incremental).
//!
//! [`OpenAiProvider`](openai::OpenAiProvider) implements the trait against
//! an OpenAI-compatible chat-completions endpoint; [`MockProvider`](mock::MockProvider)
//! provides scripted replies for tests.

#![deny(unsafe_code)]

pub mod mock;
pub mod openai;
pub mod provider;
pub mod sse;

pub use mock::{MockProvider, MockReply};
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use provider::{CompletionProvider, FragmentStream, GatewayError, GatewayResult};
