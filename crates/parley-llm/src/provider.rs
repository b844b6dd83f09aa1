//! # Completion provider trait
//!
//! Boundary to the external language-model service. Implementors expose
//! two request modes over the same turn history:
//!
//! - **single-shot** ([`CompletionProvider::complete`]): one reply string
//!   or a [`GatewayError`]
//! - **incremental** ([`CompletionProvider::stream`]): a finite,
//!   non-restartable stream of content fragments, concatenated by the
//!   caller in delivery order. The stream may terminate early with an
//!   `Err` item; fragments already yielded stand.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use parley_core::Turn;

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Boxed fragment stream returned by [`CompletionProvider::stream`].
///
/// Finite and non-restartable: the caller consumes it once, concatenating
/// `Ok` fragments in delivery order. An `Err` item ends the stream; the
/// concatenation so far is the final (possibly truncated) content.
pub type FragmentStream = Pin<Box<dyn Stream<Item = GatewayResult<String>> + Send>>;

/// Errors from the completion gateway (network/provider failure or
/// malformed response).
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// HTTP request failed (transport, timeout, connect).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SSE stream parsing failed.
    #[error("SSE parse error: {message}")]
    SseParse {
        /// Error description.
        message: String,
    },

    /// Authentication failed (invalid or missing API key).
    #[error("auth error: {message}")]
    Auth {
        /// Error description.
        message: String,
    },

    /// Rate limited by the provider.
    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested retry delay in milliseconds.
        retry_after_ms: u64,
        /// Error description.
        message: String,
    },

    /// Provider returned an API error.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
        /// Provider-specific error code.
        code: Option<String>,
        /// Whether this error can be retried.
        retryable: bool,
    },

    /// The provider answered 2xx but the body was not a usable reply
    /// (no choices, null content).
    #[error("malformed completion response: {message}")]
    MalformedResponse {
        /// What was missing or wrong.
        message: String,
    },

    /// Provider-specific error.
    #[error("{message}")]
    Other {
        /// Error description.
        message: String,
    },
}

impl GatewayError {
    /// Whether this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| {
                        s == reqwest::StatusCode::TOO_MANY_REQUESTS || s.is_server_error()
                    })
            }
            Self::RateLimited { .. } => true,
            Self::Api { retryable, .. } => *retryable,
            Self::SseParse { .. }
            | Self::Auth { .. }
            | Self::Json(_)
            | Self::MalformedResponse { .. }
            | Self::Other { .. } => false,
        }
    }

    /// Error category string for logging.
    #[must_use]
    pub fn category(&self) -> &str {
        match self {
            Self::Http(_) => "network",
            Self::Json(_) | Self::SseParse { .. } | Self::MalformedResponse { .. } => "parse",
            Self::Auth { .. } => "auth",
            Self::RateLimited { .. } => "rate_limit",
            Self::Api { .. } => "api",
            Self::Other { .. } => "unknown",
        }
    }
}

/// Boundary to the external language-model service.
///
/// Implementors must be `Send + Sync`; one provider instance is shared by
/// every session in the process.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Model identifier requests are issued against.
    fn model(&self) -> &str;

    /// Single-shot completion: full turn history in (system turn first),
    /// one assistant reply content out.
    async fn complete(&self, turns: &[Turn]) -> GatewayResult<String>;

    /// Incremental completion: the same history in, a lazy fragment
    /// stream out. See [`FragmentStream`] for consumption rules.
    async fn stream(&self, turns: &[Turn]) -> GatewayResult<FragmentStream>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_is_retryable() {
        let err = GatewayError::RateLimited {
            retry_after_ms: 5000,
            message: "too many requests".into(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.category(), "rate_limit");
    }

    #[test]
    fn api_error_retryable_flag_respected() {
        let err = GatewayError::Api {
            status: 503,
            message: "overloaded".into(),
            code: None,
            retryable: true,
        };
        assert!(err.is_retryable());

        let err = GatewayError::Api {
            status: 400,
            message: "bad request".into(),
            code: Some("invalid_request".into()),
            retryable: false,
        };
        assert!(!err.is_retryable());
        assert_eq!(err.category(), "api");
    }

    #[test]
    fn auth_error_not_retryable() {
        let err = GatewayError::Auth {
            message: "invalid key".into(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.category(), "auth");
    }

    #[test]
    fn malformed_response_not_retryable() {
        let err = GatewayError::MalformedResponse {
            message: "no choices".into(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.category(), "parse");
    }

    #[tokio::test]
    async fn http_timeout_is_retryable() {
        let err = reqwest::Client::new()
            .get("http://[::1]:1")
            .timeout(std::time::Duration::from_nanos(1))
            .send()
            .await
            .unwrap_err();
        assert!(GatewayError::Http(err).is_retryable());
    }

    #[test]
    fn display_messages() {
        let err = GatewayError::Api {
            status: 429,
            message: "slow down".into(),
            code: None,
            retryable: true,
        };
        assert_eq!(err.to_string(), "API error (429): slow down");

        let err = GatewayError::SseParse {
            message: "unexpected EOF".into(),
        };
        assert_eq!(err.to_string(), "SSE parse error: unexpected EOF");
    }

    #[test]
    fn provider_trait_is_object_safe() {
        fn assert_object_safe(_: &dyn CompletionProvider) {}
        let _ = assert_object_safe;
    }

    #[test]
    fn provider_trait_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn CompletionProvider>();
    }
}
