//! # parley-server
//!
//! Axum HTTP + WebSocket server for the Parley interview relay.
//!
//! The REST surface drives the session lifecycle (create → start → turns
//! → end); the WebSocket endpoint is the host bridge, relaying each
//! updated transcript to the hosting survey page. Cross-origin access is
//! restricted to the single configured origin — there is no wildcard
//! broadcast.

#![deny(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod health;
pub mod registry;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod ws;

pub use bridge::{BridgeManager, ClientConnection};
pub use config::{ServerConfig, SessionDefaults};
pub use registry::{RegistryError, SessionRegistry};
pub use server::{AppState, ParleyServer};
pub use shutdown::ShutdownCoordinator;
