//! Host-bridge WebSocket endpoint.
//!
//! `GET /ws?session=<id>` upgrades to a one-way relay: the page receives
//! a frame per transcript update and sends nothing back (inbound frames
//! are ignored). The upgrade is origin-checked against the configured
//! allowed origin before any socket is accepted.

use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::bridge::ClientConnection;
use crate::server::AppState;

/// Outbound frame queue depth per connection.
const FRAME_QUEUE_DEPTH: usize = 32;

/// `GET /ws` query parameters.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Session to bind this connection to.
    pub session: String,
}

/// Whether a request `Origin` is acceptable.
///
/// No `Origin` header (same-origin requests, native shims, curl) is
/// always accepted; a cross-origin request must match the configured
/// origin exactly. There is no wildcard.
#[must_use]
pub fn origin_allowed(origin: Option<&str>, allowed: Option<&str>) -> bool {
    match origin {
        None => true,
        Some(o) => allowed == Some(o),
    }
}

/// `GET /ws?session=<id>` — host-bridge upgrade.
///
/// The upgrade itself is extracted as a `Result` so the origin and
/// session checks run (and report their own statuses) even when the
/// connection cannot be upgraded.
pub async fn ws_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    if !origin_allowed(origin, state.config.allowed_origin.as_deref()) {
        return (StatusCode::FORBIDDEN, "origin not allowed").into_response();
    }

    if state.registry.get(&query.session).await.is_err() {
        return (StatusCode::NOT_FOUND, "unknown session").into_response();
    }

    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state, query.session)),
        Err(rejection) => rejection.into_response(),
    }
}

/// Pump relay frames to the page until either side closes.
async fn handle_socket(socket: WebSocket, state: AppState, session_id: String) {
    let (tx, mut rx) = mpsc::channel::<String>(FRAME_QUEUE_DEPTH);
    let connection = Arc::new(ClientConnection::new(Uuid::now_v7().to_string(), tx));
    connection.bind_session(session_id.clone());
    state.bridge.add(connection.clone()).await;
    debug!(conn_id = %connection.id, session_id, "host bridge connected");

    let (mut sender, mut receiver) = socket.split();
    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Some(frame) => {
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // one-way bridge: inbound frames are ignored
                Some(Ok(_)) => {}
            },
        }
    }

    state.bridge.remove(&connection.id).await;
    debug!(conn_id = %connection.id, session_id, "host bridge disconnected");
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
