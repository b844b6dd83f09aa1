//! `ParleyServer` — router assembly and the serve loop.

use std::sync::Arc;
use std::time::Instant;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use parley_llm::CompletionProvider;
use parley_sheets::TranscriptSink;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::bridge::BridgeManager;
use crate::config::{ServerConfig, SessionDefaults};
use crate::registry::SessionRegistry;
use crate::routes;
use crate::shutdown::ShutdownCoordinator;
use crate::ws;

/// Shared state accessible from route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live sessions.
    pub registry: Arc<SessionRegistry>,
    /// Host-bridge connection fan-out.
    pub bridge: Arc<BridgeManager>,
    /// Shutdown latch.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Completion gateway shared by all sessions.
    pub provider: Arc<dyn CompletionProvider>,
    /// Persistence sink shared by all sessions.
    pub sink: Arc<dyn TranscriptSink>,
    /// Per-session defaults.
    pub defaults: Arc<SessionDefaults>,
    /// Network configuration.
    pub config: Arc<ServerConfig>,
    /// When the server started.
    pub start_time: Instant,
}

/// The interview relay server.
pub struct ParleyServer {
    state: AppState,
}

impl ParleyServer {
    /// Assemble a server from its collaborators.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        defaults: SessionDefaults,
        provider: Arc<dyn CompletionProvider>,
        sink: Arc<dyn TranscriptSink>,
    ) -> Self {
        let state = AppState {
            registry: Arc::new(SessionRegistry::new(config.max_concurrent_sessions)),
            bridge: Arc::new(BridgeManager::new()),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            provider,
            sink,
            defaults: Arc::new(defaults),
            config: Arc::new(config),
            start_time: Instant::now(),
        };
        Self { state }
    }

    /// Build the router with all routes and layers.
    #[must_use]
    pub fn router(&self) -> Router {
        let router = Router::new()
            .route("/health", get(routes::health_handler))
            .route("/sessions", post(routes::create_session))
            .route("/sessions/{id}/start", post(routes::start_session))
            .route("/sessions/{id}/turns", post(routes::submit_turn))
            .route("/sessions/{id}/end", post(routes::end_session))
            .route("/ws", get(ws::ws_handler))
            .layer(TraceLayer::new_for_http());

        let router = match self.state.config.allowed_origin.as_deref() {
            Some(origin) => router.layer(cors_for(origin)),
            None => router,
        };

        router.with_state(self.state.clone())
    }

    /// The shutdown latch, for signal handlers.
    #[must_use]
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// The bridge manager.
    #[must_use]
    pub fn bridge(&self) -> &Arc<BridgeManager> {
        &self.state.bridge
    }

    /// The session registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.state.registry
    }

    /// Bind and serve until the shutdown latch triggers.
    pub async fn run(self) -> std::io::Result<()> {
        let addr = format!("{}:{}", self.state.config.host, self.state.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(addr = %listener.local_addr()?, "interview relay listening");

        let shutdown = self.state.shutdown.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await
    }
}

/// CORS restricted to the single configured origin.
fn cors_for(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(value),
        Err(e) => {
            warn!(origin, error = %e, "unparseable allowed origin, cross-origin requests will fail");
            layer
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
