//! Wire types for the chat-completions API.

use parley_core::{Role, Turn};
use serde::{Deserialize, Serialize};

/// Default chat-completions base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// One `{role, content}` pair in a completion request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker role, lowercase on the wire.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

/// Chat-completions request body.
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// Ordered conversation, system turn first.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Reply token cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Whether to stream the reply as SSE chunks.
    pub stream: bool,
}

// ── Single-shot response ─────────────────────────────────────────────────────

/// Single-shot response body. Only the fields we consume.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatResponse {
    /// Completion choices; the first one carries the reply.
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

/// One completion choice.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatChoice {
    /// The assistant message.
    pub message: ChoiceMessage,
}

/// The message inside a choice. `content` can be null for refusals and
/// tool-call responses, which this relay never requests.
#[derive(Clone, Debug, Deserialize)]
pub struct ChoiceMessage {
    /// Reply text.
    pub content: Option<String>,
}

// ── Streaming chunks ─────────────────────────────────────────────────────────

/// One `chat.completion.chunk` SSE event.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatChunk {
    /// Chunk choices; the first one carries the delta.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// One choice within a streaming chunk.
#[derive(Clone, Debug, Deserialize)]
pub struct ChunkChoice {
    /// Incremental content delta.
    #[serde(default)]
    pub delta: ChunkDelta,
    /// Set on the terminal chunk.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The delta payload of a streaming chunk.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChunkDelta {
    /// New content fragment, absent on role/terminal chunks.
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatChunk {
    /// Extract the content fragment from this chunk, if it carries one.
    #[must_use]
    pub fn fragment(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .filter(|s| !s.is_empty())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_from_turn() {
        let msg = ChatMessage::from(&Turn::user("Hi"));
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hi");
    }

    #[test]
    fn request_serializes_lowercase_roles() {
        let req = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![
                ChatMessage::from(&Turn::system("You are an interview assistant.")),
                ChatMessage::from(&Turn::user("Hi")),
            ],
            temperature: None,
            max_tokens: None,
            stream: false,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["stream"], false);
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn request_includes_optional_fields_when_set() {
        let req = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![],
            temperature: Some(0.2),
            max_tokens: Some(512),
            stream: true,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["temperature"], 0.2);
        assert_eq!(json["max_tokens"], 512);
        assert_eq!(json["stream"], true);
    }

    #[test]
    fn response_parses_reply() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hello"}}]}"#;
        let resp: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            resp.choices[0].message.content.as_deref(),
            Some("Hello")
        );
    }

    #[test]
    fn response_tolerates_missing_choices() {
        let resp: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.choices.is_empty());
    }

    #[test]
    fn response_tolerates_null_content() {
        let body = r#"{"choices":[{"message":{"content":null}}]}"#;
        let resp: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(resp.choices[0].message.content.is_none());
    }

    #[test]
    fn chunk_fragment_extracted() {
        let body = r#"{"choices":[{"delta":{"content":"He"},"finish_reason":null}]}"#;
        let chunk: ChatChunk = serde_json::from_str(body).unwrap();
        assert_eq!(chunk.fragment(), Some("He"));
    }

    #[test]
    fn chunk_role_preamble_has_no_fragment() {
        let body = r#"{"choices":[{"delta":{"role":"assistant"},"finish_reason":null}]}"#;
        let chunk: ChatChunk = serde_json::from_str(body).unwrap();
        assert_eq!(chunk.fragment(), None);
    }

    #[test]
    fn chunk_terminal_has_no_fragment() {
        let body = r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        let chunk: ChatChunk = serde_json::from_str(body).unwrap();
        assert_eq!(chunk.fragment(), None);
        assert_eq!(chunk.choices[0].finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn chunk_empty_fragment_filtered() {
        let body = r#"{"choices":[{"delta":{"content":""}}]}"#;
        let chunk: ChatChunk = serde_json::from_str(body).unwrap();
        assert_eq!(chunk.fragment(), None);
    }

    #[test]
    fn chunk_without_choices() {
        let chunk: ChatChunk = serde_json::from_str("{}").unwrap();
        assert_eq!(chunk.fragment(), None);
    }
}
