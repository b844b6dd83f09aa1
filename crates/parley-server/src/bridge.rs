//! Host-bridge fan-out to connected WebSocket clients.
//!
//! Each hosting page opens one WebSocket bound to its session; the
//! [`BridgeManager`] implements [`TranscriptRelay`], serializing each
//! payload once and delivering it to every connection bound to that
//! payload's session. Fire-and-forget: send failures are logged, never
//! raised.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parley_runtime::{HostRelayPayload, TranscriptRelay};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

/// One connected host page.
pub struct ClientConnection {
    /// Connection ID (distinct from the session ID — several pages may
    /// watch one session).
    pub id: String,
    session_id: parking_lot::RwLock<Option<String>>,
    tx: mpsc::Sender<String>,
}

impl ClientConnection {
    /// Create a connection that forwards outbound frames into `tx`.
    #[must_use]
    pub fn new(id: String, tx: mpsc::Sender<String>) -> Self {
        Self {
            id,
            session_id: parking_lot::RwLock::new(None),
            tx,
        }
    }

    /// Bind this connection to a session.
    pub fn bind_session(&self, session_id: String) {
        *self.session_id.write() = Some(session_id);
    }

    /// The bound session, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().clone()
    }

    /// Queue one outbound frame. Returns `false` when the peer's queue
    /// is full or closed.
    #[must_use]
    pub fn send(&self, frame: String) -> bool {
        self.tx.try_send(frame).is_ok()
    }
}

/// Connection registry and per-session relay fan-out.
#[derive(Default)]
pub struct BridgeManager {
    connections: RwLock<HashMap<String, Arc<ClientConnection>>>,
}

impl BridgeManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection.
    pub async fn add(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write().await;
        let _ = conns.insert(connection.id.clone(), connection);
    }

    /// Remove a connection by ID.
    pub async fn remove(&self, connection_id: &str) {
        let mut conns = self.connections.write().await;
        let _ = conns.remove(connection_id);
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[async_trait]
impl TranscriptRelay for BridgeManager {
    async fn relay(&self, payload: &HostRelayPayload) {
        let frame = match serde_json::to_string(payload) {
            Ok(f) => f,
            Err(e) => {
                warn!(session_id = %payload.session_id, error = %e, "failed to serialize relay payload");
                return;
            }
        };

        let session_id = payload.session_id.as_str();
        let conns = self.connections.read().await;
        let mut recipients = 0;
        for conn in conns.values() {
            if conn.session_id().as_deref() == Some(session_id) {
                recipients += 1;
                if !conn.send(frame.clone()) {
                    warn!(conn_id = %conn.id, session_id, "failed to deliver relay frame");
                }
            }
        }
        debug!(session_id, recipients, complete = payload.complete, "transcript relayed");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
