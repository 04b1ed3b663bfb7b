//! WebAPI - HTTP and WebSocket Endpoints
//!
//! ## Responsibilities
//!
//! - REST routes for health, camera listing, latest results
//! - WebSocket endpoint for subscriptions and result delivery

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connections: state.hub.connection_count(),
        watched_locations: state.registry.watched_count().await,
    };

    Json(response)
}

/// Service identity endpoint
pub async fn service_status(State(_state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": "hazardwatch",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}
