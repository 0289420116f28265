//! HTTP API for the Scrivener service.
//!
//! This module provides the endpoints for:
//! - Image upload and extraction lookup
//! - WebSocket connections for processing notifications
//! - Health monitoring
//! - The static landing page

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::service::ScrivenerService;
use crate::websocket::handle_ws_connection;

pub mod uploads;
use uploads::{get_extraction_handler, upload_handler};

/// Application state
pub struct AppState {
    pub service: Arc<ScrivenerService>,
    pub start_time: Instant,
}

/// Build the API router
pub fn router(service: Arc<ScrivenerService>) -> Router {
    let static_dir = service.config.storage.static_dir.clone();
    // Use the configured max upload size for the upload route
    let max_body_size = service.config.limits.max_upload_size_bytes as usize;

    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route(
            "/upload",
            post(upload_handler).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route("/uploads/{id}", get(get_extraction_handler))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        active_listeners: state.service.hub.connection_count(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    active_listeners: usize,
}

// === WebSocket ===

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("WebSocket upgrade request received");
    let hub = state.service.hub.clone();
    ws.on_upgrade(move |socket| handle_ws_connection(socket, hub))
}
