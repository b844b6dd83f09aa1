//! Scripted provider for deterministic tests without API calls.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::stream;
use parley_core::Turn;

use crate::provider::{CompletionProvider, FragmentStream, GatewayError, GatewayResult};

/// One pre-programmed gateway response.
#[derive(Clone, Debug)]
pub enum MockReply {
    /// A full reply. Streamed as a single fragment.
    Reply(String),
    /// A reply delivered as these fragments, in order.
    Fragments(Vec<String>),
    /// Fragments followed by a mid-stream transport failure.
    ///
    /// `complete` treats this as an outright failure; `stream` yields the
    /// fragments and then one `Err` item.
    FragmentsThenError {
        /// Fragments delivered before the failure.
        fragments: Vec<String>,
        /// Failure description.
        message: String,
    },
    /// The request itself fails.
    Error(String),
}

/// Provider that replays scripted responses in call order.
pub struct MockProvider {
    replies: Vec<MockReply>,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Create a provider that serves `replies` in order, one per call.
    #[must_use]
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies,
            calls: AtomicUsize::new(0),
        }
    }

    /// Convenience: a provider with one plain reply.
    #[must_use]
    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(vec![MockReply::Reply(text.into())])
    }

    /// Number of gateway calls made so far (either mode).
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn next_reply(&self) -> GatewayResult<MockReply> {
        let idx = self.calls.fetch_add(1, Ordering::Relaxed);
        self.replies
            .get(idx)
            .cloned()
            .ok_or_else(|| GatewayError::Other {
                message: format!("no scripted reply for call {idx}"),
            })
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, _turns: &[Turn]) -> GatewayResult<String> {
        match self.next_reply()? {
            MockReply::Reply(text) => Ok(text),
            MockReply::Fragments(fragments) => Ok(fragments.concat()),
            MockReply::FragmentsThenError { message, .. } | MockReply::Error(message) => {
                Err(GatewayError::Other { message })
            }
        }
    }

    async fn stream(&self, _turns: &[Turn]) -> GatewayResult<FragmentStream> {
        let items: Vec<GatewayResult<String>> = match self.next_reply()? {
            MockReply::Reply(text) => vec![Ok(text)],
            MockReply::Fragments(fragments) => fragments.into_iter().map(Ok).collect(),
            MockReply::FragmentsThenError { fragments, message } => fragments
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(GatewayError::Other { message })))
                .collect(),
            MockReply::Error(message) => return Err(GatewayError::Other { message }),
        };
        Ok(Box::pin(stream::iter(items)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
