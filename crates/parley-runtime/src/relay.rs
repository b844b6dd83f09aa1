//! The host-bridge relay boundary.
//!
//! After every successful turn (and once more on submit), the controller
//! hands the serialized transcript to a [`TranscriptRelay`] for delivery
//! to the hosting survey page. Delivery is one-way and fire-and-forget:
//! the relay never reports failure to the controller.

use async_trait::async_trait;
use parking_lot::Mutex;
use parley_core::SessionId;
use serde::{Deserialize, Serialize};

use crate::session::Session;

/// The `type` tag the hosting page dispatches on.
pub const RELAY_PAYLOAD_TYPE: &str = "QualtricsDataTransfer";

/// One relay message to the hosting page.
///
/// `data` is the serialized transcript; the receiving page splits it on
/// the transcript separator, so the separator convention is part of this
/// contract too.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRelayPayload {
    /// Always [`RELAY_PAYLOAD_TYPE`].
    #[serde(rename = "type")]
    pub payload_type: String,
    /// Session the payload belongs to.
    pub session_id: SessionId,
    /// Serialized visible transcript.
    pub data: String,
    /// `true` only on the final relay fired by `end()`.
    pub complete: bool,
    /// Echoed external correlation ID, when the session has one.
    pub echo_id: Option<String>,
}

impl HostRelayPayload {
    /// Build a payload from the session's current transcript.
    #[must_use]
    pub fn from_session(session: &Session, complete: bool) -> Self {
        Self {
            payload_type: RELAY_PAYLOAD_TYPE.to_owned(),
            session_id: session.id().clone(),
            data: session.transcript().serialize(),
            complete,
            echo_id: session.echo_id().map(ToOwned::to_owned),
        }
    }
}

/// One-way relay to the hosting page.
///
/// Shared by many sessions without coordination; each payload carries its
/// own session ID.
#[async_trait]
pub trait TranscriptRelay: Send + Sync {
    /// Deliver one payload. Fire-and-forget — implementations log their
    /// own failures.
    async fn relay(&self, payload: &HostRelayPayload);
}

/// Relay that discards everything. For deployments without a host page.
#[derive(Debug, Default)]
pub struct NullRelay;

#[async_trait]
impl TranscriptRelay for NullRelay {
    async fn relay(&self, _payload: &HostRelayPayload) {}
}

/// Relay that records payloads in memory, for tests.
#[derive(Debug, Default)]
pub struct MemoryRelay {
    payloads: Mutex<Vec<HostRelayPayload>>,
}

impl MemoryRelay {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of relayed payloads, in relay order.
    #[must_use]
    pub fn payloads(&self) -> Vec<HostRelayPayload> {
        self.payloads.lock().clone()
    }

    /// Number of relayed payloads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payloads.lock().len()
    }

    /// Whether nothing has been relayed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payloads.lock().is_empty()
    }
}

#[async_trait]
impl TranscriptRelay for MemoryRelay {
    async fn relay(&self, payload: &HostRelayPayload) {
        self.payloads.lock().push(payload.clone());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::Turn;
    use std::collections::BTreeMap;

    fn session_with_exchange() -> Session {
        let mut params = BTreeMap::new();
        let _ = params.insert("Q_E_ID".to_owned(), "ABC123".to_owned());
        let mut session = Session::new("You are an interview assistant.", params);
        session.transcript_mut().append(Turn::user("Hi")).unwrap();
        session
            .transcript_mut()
            .append(Turn::assistant("Hello"))
            .unwrap();
        session
    }

    #[test]
    fn payload_from_session() {
        let session = session_with_exchange();
        let payload = HostRelayPayload::from_session(&session, false);
        assert_eq!(payload.payload_type, "QualtricsDataTransfer");
        assert_eq!(payload.session_id, *session.id());
        assert_eq!(payload.data, "User: Hi | Assistant: Hello");
        assert!(!payload.complete);
        assert_eq!(payload.echo_id.as_deref(), Some("ABC123"));
    }

    #[test]
    fn payload_wire_format() {
        let session = session_with_exchange();
        let payload = HostRelayPayload::from_session(&session, true);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "QualtricsDataTransfer");
        assert_eq!(json["data"], "User: Hi | Assistant: Hello");
        assert_eq!(json["complete"], true);
        assert_eq!(json["echoId"], "ABC123");
        assert!(json.get("sessionId").is_some());
    }

    #[test]
    fn payload_echo_id_null_when_absent() {
        let session = Session::new("prompt", BTreeMap::new());
        let payload = HostRelayPayload::from_session(&session, false);
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json["echoId"].is_null());
    }

    #[test]
    fn payload_never_contains_system_turn() {
        let session = session_with_exchange();
        let payload = HostRelayPayload::from_session(&session, false);
        assert!(!payload.data.contains("System"));
        assert!(!payload.data.contains("interview assistant"));
    }

    #[tokio::test]
    async fn memory_relay_records_in_order() {
        let relay = MemoryRelay::new();
        let session = session_with_exchange();
        relay
            .relay(&HostRelayPayload::from_session(&session, false))
            .await;
        relay
            .relay(&HostRelayPayload::from_session(&session, true))
            .await;

        let payloads = relay.payloads();
        assert_eq!(payloads.len(), 2);
        assert!(!payloads[0].complete);
        assert!(payloads[1].complete);
    }

    #[tokio::test]
    async fn null_relay_discards() {
        let relay = NullRelay;
        let session = session_with_exchange();
        relay
            .relay(&HostRelayPayload::from_session(&session, false))
            .await;
        // nothing observable, nothing panics
    }
}
