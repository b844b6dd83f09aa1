//! The per-process session registry.
//!
//! Sessions are keyed by ID and wrapped in a per-session mutex: holding
//! the lock across a turn is what serializes input while a completion is
//! outstanding. No cross-session state is shared through the registry.

use std::collections::HashMap;
use std::sync::Arc;

use parley_core::SessionId;
use parley_runtime::SessionController;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Registry failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The concurrent-session bound is reached.
    #[error("session capacity reached ({capacity})")]
    Full {
        /// The configured bound.
        capacity: usize,
    },

    /// No session with the given ID.
    #[error("unknown session")]
    NotFound,
}

/// Holds every live session controller.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionController>>>>,
    capacity: usize,
}

impl SessionRegistry {
    /// Create a registry bounded at `capacity` sessions.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Register a new controller, returning its session ID.
    pub async fn insert(&self, controller: SessionController) -> Result<SessionId, RegistryError> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.capacity {
            return Err(RegistryError::Full {
                capacity: self.capacity,
            });
        }
        let id = controller.session().id().clone();
        let _ = sessions.insert(id.as_str().to_owned(), Arc::new(Mutex::new(controller)));
        Ok(id)
    }

    /// Look up a controller by session ID.
    pub async fn get(&self, id: &str) -> Result<Arc<Mutex<SessionController>>, RegistryError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(RegistryError::NotFound)
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
