//! Chat-completions client implementing [`CompletionProvider`].
//!
//! Builds and sends requests to an OpenAI-compatible `/chat/completions`
//! endpoint. Single-shot requests read `choices[0].message.content`;
//! streaming requests consume SSE `chat.completion.chunk` events and
//! yield their `delta.content` fragments.
//!
//! # Authentication
//!
//! Bearer API key, supplied in the config (resolved from the environment
//! by the caller — the key never lives in a settings file).

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parley_core::retry::parse_retry_after_ms;
use parley_core::Turn;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use crate::provider::{CompletionProvider, FragmentStream, GatewayError, GatewayResult};
use crate::sse::sse_data_lines;

use super::types::{ChatChunk, ChatMessage, ChatRequest, ChatResponse, DEFAULT_BASE_URL};

/// Fallback retry delay when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_MS: u64 = 1000;

/// Configuration for [`OpenAiProvider`].
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API base URL (up to and excluding `/chat/completions`).
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Bearer API key.
    pub api_key: String,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Reply token cap.
    pub max_tokens: Option<u32>,
    /// Whole-request timeout in milliseconds (covers the full streamed
    /// body, not just connection setup).
    pub timeout_ms: u64,
}

impl OpenAiConfig {
    /// Config with defaults for everything but model and key.
    #[must_use]
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            model: model.into(),
            api_key: api_key.into(),
            temperature: None,
            max_tokens: None,
            timeout_ms: 60_000,
        }
    }
}

/// OpenAI-compatible completion provider.
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: reqwest::Client,
    endpoint: String,
}

impl OpenAiProvider {
    /// Create a new provider. The HTTP client is reused across requests.
    #[must_use]
    pub fn new(config: OpenAiConfig) -> Self {
        let endpoint = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        debug!(model = %config.model, endpoint = %endpoint, "chat-completions provider initialized");
        Self {
            config,
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    fn build_headers(&self) -> GatewayResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", self.config.api_key);
        let _ = headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).map_err(|e| GatewayError::Auth {
                message: format!("invalid authorization header: {e}"),
            })?,
        );
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn build_request(&self, turns: &[Turn], stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: turns.iter().map(ChatMessage::from).collect(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream,
        }
    }

    /// Send the request and classify any non-2xx response.
    async fn send(
        &self,
        request: &ChatRequest,
        accept: &'static str,
    ) -> GatewayResult<reqwest::Response> {
        let mut headers = self.build_headers()?;
        let _ = headers.insert(ACCEPT, HeaderValue::from_static(accept));

        let response = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .json(request)
            .send()
            .await
            .map_err(GatewayError::Http)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Auth {
                message: format!("{status}: {}", error_message(&body)),
            });
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after_ms)
                .unwrap_or(DEFAULT_RETRY_AFTER_MS);
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::RateLimited {
                retry_after_ms,
                message: error_message(&body),
            });
        }

        let body = response.text().await.unwrap_or_default();
        let (message, code) = parse_api_error(&body, status.as_u16());
        Err(GatewayError::Api {
            status: status.as_u16(),
            message,
            code,
            retryable: status.is_server_error(),
        })
    }
}

/// Pull `error.message` out of an API error body, falling back to the raw
/// body text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_owned())
}

/// Parse an API error body into `(message, code)`.
fn parse_api_error(body: &str, status: u16) -> (String, Option<String>) {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let error = &json["error"];
        let message = error["message"]
            .as_str()
            .unwrap_or("unknown error")
            .to_owned();
        let code = error["type"].as_str().map(String::from);
        (message, code)
    } else {
        (format!("HTTP {status}: {body}"), None)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, turns: &[Turn]) -> GatewayResult<String> {
        debug!(
            model = %self.config.model,
            turn_count = turns.len(),
            "single-shot completion request"
        );

        let request = self.build_request(turns, false);
        let response = self.send(&request, "application/json").await?;

        let parsed: ChatResponse = response.json().await.map_err(GatewayError::Http)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content);

        match content {
            Some(text) => Ok(text),
            None => Err(GatewayError::MalformedResponse {
                message: "response carried no assistant content".into(),
            }),
        }
    }

    async fn stream(&self, turns: &[Turn]) -> GatewayResult<FragmentStream> {
        debug!(
            model = %self.config.model,
            turn_count = turns.len(),
            "streaming completion request"
        );

        let request = self.build_request(turns, true);
        let response = self.send(&request, "text/event-stream").await?;

        // Chat completions end with an explicit [DONE] marker, so a
        // trailing unterminated buffer carries nothing useful.
        let data_lines = sse_data_lines(response.bytes_stream(), false);

        let fragments = data_lines.filter_map(|item| async move {
            match item {
                Ok(line) => match serde_json::from_str::<ChatChunk>(&line) {
                    Ok(chunk) => chunk.fragment().map(|f| Ok(f.to_owned())),
                    Err(e) => {
                        warn!(
                            error = %e,
                            preview = parley_core::text::truncate_str(&line, 100),
                            "skipping unparseable completion chunk"
                        );
                        None
                    }
                },
                Err(e) => Some(Err(e)),
            }
        });

        Ok(Box::pin(fragments))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenAiProvider {
        let mut config = OpenAiConfig::new("gpt-4o-mini", "test-key");
        config.base_url = server.uri();
        OpenAiProvider::new(config)
    }

    fn interview_turns() -> Vec<Turn> {
        vec![
            Turn::system("You are an interview assistant."),
            Turn::user("Hi"),
        ]
    }

    // ── config / construction ────────────────────────────────────────

    #[test]
    fn config_defaults() {
        let config = OpenAiConfig::new("gpt-4o-mini", "k");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_ms, 60_000);
        assert!(config.temperature.is_none());
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let mut config = OpenAiConfig::new("m", "k");
        config.base_url = "https://api.example.com/v1/".into();
        let provider = OpenAiProvider::new(config);
        assert_eq!(
            provider.endpoint,
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn model_accessor() {
        let provider = OpenAiProvider::new(OpenAiConfig::new("gpt-4o-mini", "k"));
        assert_eq!(provider.model(), "gpt-4o-mini");
    }

    // ── build_request ────────────────────────────────────────────────

    #[test]
    fn request_preserves_turn_order() {
        let provider = OpenAiProvider::new(OpenAiConfig::new("gpt-4o-mini", "k"));
        let turns = vec![
            Turn::system("prompt"),
            Turn::user("q1"),
            Turn::assistant("a1"),
            Turn::user("q2"),
        ];
        let request = provider.build_request(&turns, false);
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[0].role, parley_core::Role::System);
        assert_eq!(request.messages[3].content, "q2");
        assert!(!request.stream);
    }

    // ── complete ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn complete_returns_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "stream": false,
                "messages": [
                    {"role": "system", "content": "You are an interview assistant."},
                    {"role": "user", "content": "Hi"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Hello"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let reply = provider.complete(&interview_turns()).await.unwrap();
        assert_eq!(reply, "Hello");
    }

    #[tokio::test]
    async fn complete_no_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider.complete(&interview_turns()).await.unwrap_err();
        assert_matches!(err, GatewayError::MalformedResponse { .. });
    }

    #[tokio::test]
    async fn complete_null_content_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": null}}]
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider.complete(&interview_turns()).await.unwrap_err();
        assert_matches!(err, GatewayError::MalformedResponse { .. });
    }

    #[tokio::test]
    async fn complete_server_error_is_retryable_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": {"type": "server_error", "message": "boom"}
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider.complete(&interview_turns()).await.unwrap_err();
        assert_matches!(
            err,
            GatewayError::Api { status: 500, retryable: true, ref message, .. } if message == "boom"
        );
    }

    #[tokio::test]
    async fn complete_unauthorized_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Incorrect API key provided"}
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider.complete(&interview_turns()).await.unwrap_err();
        assert_matches!(err, GatewayError::Auth { ref message } if message.contains("Incorrect API key"));
    }

    #[tokio::test]
    async fn complete_rate_limited_parses_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "7")
                    .set_body_json(serde_json::json!({
                        "error": {"message": "Rate limit reached"}
                    })),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider.complete(&interview_turns()).await.unwrap_err();
        assert_matches!(err, GatewayError::RateLimited { retry_after_ms: 7000, .. });
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn complete_bad_request_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"type": "invalid_request_error", "message": "bad"}
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider.complete(&interview_turns()).await.unwrap_err();
        assert_matches!(
            err,
            GatewayError::Api { status: 400, retryable: false, ref code, .. }
                if code.as_deref() == Some("invalid_request_error")
        );
    }

    // ── stream ───────────────────────────────────────────────────────

    fn sse_body(events: &[&str]) -> String {
        let mut body = String::new();
        for e in events {
            body.push_str("data: ");
            body.push_str(e);
            body.push_str("\n\n");
        }
        body
    }

    #[tokio::test]
    async fn stream_yields_fragments_in_order() {
        let server = MockServer::start().await;
        let body = sse_body(&[
            r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"delta":{"content":"He"}}]}"#,
            r#"{"choices":[{"delta":{"content":"llo"}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
            "[DONE]",
        ]);
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let stream = provider.stream(&interview_turns()).await.unwrap();
        let fragments: Vec<_> = stream.collect().await;

        let texts: Vec<String> = fragments
            .into_iter()
            .map(|f| f.unwrap())
            .collect();
        assert_eq!(texts, vec!["He", "llo"]);
    }

    #[tokio::test]
    async fn stream_skips_unparseable_chunks() {
        let server = MockServer::start().await;
        let body = sse_body(&[
            r#"{"choices":[{"delta":{"content":"ok"}}]}"#,
            "this is not json",
            r#"{"choices":[{"delta":{"content":"!"}}]}"#,
            "[DONE]",
        ]);
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let stream = provider.stream(&interview_turns()).await.unwrap();
        let texts: Vec<String> = stream.map(|f| f.unwrap()).collect().await;
        assert_eq!(texts, vec!["ok", "!"]);
    }

    #[tokio::test]
    async fn stream_request_failure_classified_before_streaming() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = match provider.stream(&interview_turns()).await {
            Ok(_) => panic!("expected stream() to fail"),
            Err(e) => e,
        };
        assert_matches!(err, GatewayError::Api { status: 503, retryable: true, .. });
    }

    // ── error body parsing ───────────────────────────────────────────

    #[test]
    fn parse_api_error_json_body() {
        let body = r#"{"error":{"type":"server_error","message":"internal"}}"#;
        let (message, code) = parse_api_error(body, 500);
        assert_eq!(message, "internal");
        assert_eq!(code.as_deref(), Some("server_error"));
    }

    #[test]
    fn parse_api_error_non_json_body() {
        let (message, code) = parse_api_error("Bad Gateway", 502);
        assert!(message.contains("502"));
        assert!(message.contains("Bad Gateway"));
        assert!(code.is_none());
    }

    #[test]
    fn parse_api_error_missing_fields() {
        let (message, code) = parse_api_error(r#"{"error":{}}"#, 400);
        assert_eq!(message, "unknown error");
        assert!(code.is_none());
    }

    #[test]
    fn error_message_falls_back_to_body() {
        assert_eq!(error_message("plain text"), "plain text");
        assert_eq!(
            error_message(r#"{"error":{"message":"structured"}}"#),
            "structured"
        );
    }
}
