//! # parley-core
//!
//! Foundation types for the Parley interview relay.
//!
//! This crate provides the shared vocabulary that all other Parley crates
//! depend on:
//!
//! - **Branded IDs**: [`SessionId`](ids::SessionId) and [`TurnId`](ids::TurnId)
//!   as newtypes for type safety
//! - **Turns**: [`Role`](turn::Role) and [`Turn`](turn::Turn), the single
//!   utterance unit of an interview
//! - **Transcript**: the append-only, per-session conversation log with its
//!   stable serialized form
//! - **Errors**: precondition, role, and persistence errors via `thiserror`
//! - **Retry**: portable backoff math shared by the HTTP adapters

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod retry;
pub mod text;
pub mod transcript;
pub mod turn;

pub use errors::{InvalidRoleError, PersistenceError, PersistenceOperation, PreconditionError};
pub use ids::{SessionId, TurnId};
pub use transcript::{Transcript, TRANSCRIPT_SEPARATOR};
pub use turn::{Role, Turn};
