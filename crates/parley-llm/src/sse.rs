//! # SSE parser
//!
//! Server-Sent Events parsing for the streaming completion mode.
//!
//! Handles line buffering from chunked responses, `data: ` prefix
//! extraction, `[DONE]` marker and comment filtering, and CR/LF cleanup.
//! Unlike a fire-and-forget event feed, a transport failure mid-stream is
//! surfaced to the consumer as a final `Err` item — the session
//! controller needs it to mark the reply as truncated rather than
//! silently ending the stream.

use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio_stream::StreamExt;

use crate::provider::GatewayError;

/// Parse SSE `data:` payloads out of an HTTP byte stream.
///
/// Yields one `Ok(String)` per data line (JSON left unparsed for the
/// caller), skipping comments, empty data, and the `[DONE]` marker. A
/// read error on the underlying stream yields a single `Err` and ends
/// the stream. When `process_remaining` is set, a trailing payload
/// without a final newline is still emitted at end of stream.
pub fn sse_data_lines<S>(
    byte_stream: S,
    process_remaining: bool,
) -> impl Stream<Item = Result<String, GatewayError>> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    futures::stream::unfold(
        SseState {
            inner: byte_stream,
            buffer: BytesMut::with_capacity(8192),
            finished: false,
        },
        move |mut state| async move {
            if state.finished {
                return None;
            }

            loop {
                // Drain complete lines already buffered
                while let Some(pos) = state.buffer.iter().position(|&b| b == b'\n') {
                    let mut line = state.buffer.split_to(pos + 1);
                    line.truncate(line.len() - 1);
                    if line.last() == Some(&b'\r') {
                        line.truncate(line.len() - 1);
                    }

                    let Ok(text) = std::str::from_utf8(&line) else {
                        continue; // skip invalid UTF-8 lines
                    };
                    if let Some(data) = extract_data(text) {
                        return Some((Ok(data), state));
                    }
                }

                match state.inner.next().await {
                    Some(Ok(chunk)) => state.buffer.extend_from_slice(&chunk),
                    Some(Err(e)) => {
                        state.finished = true;
                        return Some((Err(GatewayError::Http(e)), state));
                    }
                    None => {
                        state.finished = true;
                        if process_remaining && !state.buffer.is_empty() {
                            let text = String::from_utf8_lossy(&state.buffer).into_owned();
                            if let Some(data) = extract_data(text.trim()) {
                                return Some((Ok(data), state));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

struct SseState<S> {
    inner: S,
    buffer: BytesMut,
    finished: bool,
}

/// Extract the payload from one SSE line.
///
/// Returns `None` for comments, empty lines, non-`data` fields, empty
/// data, and the `[DONE]` marker.
fn extract_data(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    let data = trimmed
        .strip_prefix("data: ")
        .or_else(|| trimmed.strip_prefix("data:"))?
        .trim();

    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(data.to_owned())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
