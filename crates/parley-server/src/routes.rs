//! REST route handlers and wire DTOs.
//!
//! The surface mirrors the three user intents — start, free-text turn
//! submission, end/submit — plus session creation and health.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parley_core::SessionId;
use parley_runtime::{ControllerError, Session, SessionController, SessionState};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::health;
use crate::registry::RegistryError;
use crate::server::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Wire DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /sessions` request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Inbound session parameters (display name, correlation ID, ...).
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// `POST /sessions` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    /// The generated session ID.
    pub session_id: SessionId,
}

/// `POST /sessions/{id}/start` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    /// Display-only greeting, present on the first start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub greeting: Option<String>,
    /// State after the call.
    pub state: SessionState,
}

/// `POST /sessions/{id}/turns` request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    /// The participant's turn text.
    pub message: String,
}

/// `POST /sessions/{id}/turns` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    /// The assistant reply (possibly a placeholder or truncated).
    pub reply: String,
    /// `true` when a streamed reply was cut off and the partial kept.
    pub truncated: bool,
    /// Gateway failure description, when one occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_error: Option<String>,
    /// Persistence failure description, when one occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_warning: Option<String>,
}

/// `POST /sessions/{id}/end` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndResponse {
    /// User-facing confirmation.
    pub confirmation: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Error mapping
// ─────────────────────────────────────────────────────────────────────────────

/// Route-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown session ID → 404.
    #[error("unknown session")]
    NotFound,

    /// Precondition violation → 409.
    #[error("{0}")]
    Conflict(String),

    /// Session capacity reached → 503.
    #[error("{0}")]
    Capacity(String),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound => Self::NotFound,
            RegistryError::Full { .. } => Self::Capacity(err.to_string()),
        }
    }
}

impl From<ControllerError> for ApiError {
    fn from(err: ControllerError) -> Self {
        Self::Conflict(err.to_string())
    }
}

impl From<parley_core::PreconditionError> for ApiError {
    fn from(err: parley_core::PreconditionError) -> Self {
        Self::Conflict(err.to_string())
    }
}

impl ApiError {
    /// The HTTP status this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Capacity(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health_handler(State(state): State<AppState>) -> Json<health::HealthResponse> {
    let connections = state.bridge.connection_count().await;
    let sessions = state.registry.count().await;
    Json(health::health_check(state.start_time, connections, sessions))
}

/// `POST /sessions` — create a session with defaulted params.
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    let params = state.defaults.merged_params(request.params);
    let session = Session::new(&state.defaults.system_prompt, params);
    let controller = SessionController::new(
        session,
        state.provider.clone(),
        state.sink.clone(),
        state.bridge.clone(),
        state.defaults.controller_config(),
    );

    let session_id = state.registry.insert(controller).await?;
    info!(session_id = %session_id, "session created");
    Ok(Json(CreateSessionResponse { session_id }))
}

/// `POST /sessions/{id}/start` — open the turn gate.
pub async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StartResponse>, ApiError> {
    let entry = state.registry.get(&id).await?;
    let mut controller = entry.lock().await;
    let greeting = controller.start()?;
    Ok(Json(StartResponse {
        greeting,
        state: controller.session().state(),
    }))
}

/// `POST /sessions/{id}/turns` — submit one user turn.
///
/// The per-session lock is held across the completion request, which is
/// what rejects (well, queues) concurrent submissions for one session.
pub async fn submit_turn(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let entry = state.registry.get(&id).await?;
    let mut controller = entry.lock().await;
    let outcome = controller.submit_user_turn(&request.message).await?;
    Ok(Json(TurnResponse {
        reply: outcome.reply,
        truncated: outcome.truncated,
        gateway_error: outcome.gateway_error,
        persistence_warning: outcome.persistence_warning,
    }))
}

/// `POST /sessions/{id}/end` — submit the interview.
pub async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EndResponse>, ApiError> {
    let entry = state.registry.get(&id).await?;
    let mut controller = entry.lock().await;
    let confirmation = controller.end().await?;
    Ok(Json(EndResponse { confirmation }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::PreconditionError;

    #[test]
    fn registry_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(RegistryError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(RegistryError::Full { capacity: 8 }).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn precondition_maps_to_conflict() {
        let err = ApiError::from(PreconditionError::NotStarted);
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(err.to_string().contains("not been started"));
    }

    #[test]
    fn controller_error_maps_to_conflict() {
        let err = ApiError::from(ControllerError::Precondition(
            PreconditionError::EmptyMessage,
        ));
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn create_request_params_default_empty() {
        let request: CreateSessionRequest = serde_json::from_str("{}").unwrap();
        assert!(request.params.is_empty());
    }

    #[test]
    fn turn_response_skips_absent_warnings() {
        let resp = TurnResponse {
            reply: "Hello".into(),
            truncated: false,
            gateway_error: None,
            persistence_warning: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("gatewayError").is_none());
        assert!(json.get("persistenceWarning").is_none());
        assert_eq!(json["reply"], "Hello");
    }
}
