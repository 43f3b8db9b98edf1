// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay HTTP server built on axum.

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use parley_core::{GenerationSettings, ParleyError};
use parley_ollama::{OllamaClient, Timeouts};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Shared, read-only state for relay handlers.
///
/// Holds only defaults. Every request builds its own [`OllamaClient`] from
/// the merged settings, so concurrent requests share no mutable state.
#[derive(Clone)]
pub struct RelayState {
    /// Defaults applied to every request before overrides.
    pub defaults: Arc<GenerationSettings>,
    /// Upstream deadlines.
    pub timeouts: Timeouts,
}

impl RelayState {
    pub fn new(defaults: GenerationSettings, timeouts: Timeouts) -> Self {
        Self {
            defaults: Arc::new(defaults),
            timeouts,
        }
    }

    /// Builds a client for `settings` with the relay's deadlines.
    pub fn client_for(&self, settings: &GenerationSettings) -> Result<OllamaClient, ParleyError> {
        OllamaClient::from_settings(settings, self.timeouts)
    }
}

/// Relay listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Builds the relay router.
///
/// Routes:
/// - GET /api/health
/// - GET /api/config
/// - GET /api/models
/// - GET /api/history
/// - GET /v1/models
/// - POST /api/chat
/// - POST /api/chat/stream
pub fn build_router(state: RelayState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::get_health))
        .route("/api/config", get(handlers::get_config))
        .route("/api/models", get(handlers::get_models))
        .route("/api/history", get(handlers::get_history))
        .route("/v1/models", get(handlers::get_openai_models))
        .route("/api/chat", post(handlers::post_chat))
        .route("/api/chat/stream", post(handlers::post_chat_stream))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds `host:port` and serves the relay until `shutdown` resolves.
pub async fn start_server(
    config: &ServerConfig,
    state: RelayState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ParleyError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ParleyError::Internal(format!("failed to bind relay to {addr}: {e}")))?;

    serve(listener, state, shutdown).await
}

/// Serves the relay on an already bound listener.
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: RelayState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ParleyError> {
    let local = listener
        .local_addr()
        .map_err(|e| ParleyError::Internal(format!("relay listener has no address: {e}")))?;
    tracing::info!(
        addr = %local,
        upstream = %state.defaults.api_url,
        model = %state.defaults.model,
        "relay listening"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ParleyError::Internal(format!("relay server error: {e}")))?;

    tracing::info!("relay stopped");
    Ok(())
}
