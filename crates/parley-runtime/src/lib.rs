//! # parley-runtime
//!
//! Session orchestration for the Parley interview relay.
//!
//! One [`SessionController`](controller::SessionController) owns one
//! [`Session`](session::Session) and drives the three-step pipeline per
//! turn: append the user turn, obtain the assistant reply from the
//! completion gateway (single-shot or streamed), then fan the updated
//! transcript out to the persistence sink and the host bridge —
//! best-effort, independent of each other, never blocking the reply.

#![deny(unsafe_code)]

pub mod controller;
pub mod relay;
pub mod session;

pub use controller::{ControllerConfig, ControllerError, SessionController, TurnOutcome};
pub use relay::{HostRelayPayload, MemoryRelay, NullRelay, TranscriptRelay, RELAY_PAYLOAD_TYPE};
pub use session::{Session, SessionState, ECHO_PARAM};
