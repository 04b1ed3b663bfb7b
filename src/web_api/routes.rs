//! API Routes

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};

use crate::error::{Error, Result};
use crate::models::{HazardUpdate, WatchRequest};
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/healthz", get(super::health_check))
        .route("/api/status", get(super::service_status))
        // Cameras
        .route("/api/locations", get(list_locations))
        // Latest evaluation per location
        .route("/api/hazards/:location/latest", get(latest_hazard))
        // WebSocket
        .route("/api/ws", get(websocket_handler))
        .with_state(state)
}

/// List known cameras
async fn list_locations(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.directory.summaries())
}

/// Most recent evaluation for one location
async fn latest_hazard(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> Result<Json<HazardUpdate>> {
    match state.orchestrator.latest(&location).await {
        Some(update) => Ok(Json(update)),
        None => Err(Error::NotFound(format!(
            "no evaluation yet for {location}"
        ))),
    }
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle WebSocket connection
///
/// Inbound text frames are watch requests; each one wholesale-replaces the
/// session's subscription and triggers an immediate evaluation pass so the
/// client is not left waiting for the next tick.
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let (session_id, mut rx) = state.hub.register().await;

    // Forward frames from the hub to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(payload)) => {
                    match serde_json::from_str::<WatchRequest>(&payload) {
                        Ok(request) => {
                            let normalized = recv_state
                                .registry
                                .register(session_id, &request.locations)
                                .await;
                            tracing::info!(
                                session_id = %session_id,
                                locations = normalized.len(),
                                "Watch set updated"
                            );
                            recv_state.orchestrator.clone().evaluate_now(normalized);
                        }
                        Err(e) => {
                            tracing::warn!(
                                session_id = %session_id,
                                error = %e,
                                "Malformed watch request ignored"
                            );
                        }
                    }
                }
                Ok(Message::Ping(data)) => {
                    // Pong is handled automatically by axum
                    tracing::trace!("Received ping: {:?}", data);
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(session_id = %session_id, "WebSocket client disconnected");
                    break;
                }
                Err(e) => {
                    tracing::warn!(session_id = %session_id, error = %e, "WebSocket error");
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    // Drop the session from both the hub and the registry
    state.hub.unregister(&session_id).await;
    state.registry.unregister(&session_id).await;
}
