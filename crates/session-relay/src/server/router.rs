//! HTTP Router
//!
//! Sets up the axum router with the WebSocket endpoint.

use axum::{
    Json, Router,
    extract::{Query, State, WebSocketUpgrade},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handler::handle_websocket;
use super::state::AppState;
use crate::config::RelayConfig;

/// Query parameters of the WebSocket upgrade
#[derive(Debug, Default, Deserialize)]
pub struct Handshake {
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.config());

    Router::new()
        // WebSocket endpoint - all relay traffic goes through here
        .route("/ws", get(ws_upgrade))
        // Health check for monitoring/load balancers
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS restricted to the configured client origin, permissive otherwise
fn cors_layer(config: &RelayConfig) -> CorsLayer {
    let Some(origin) = config.cors_origin.as_deref() else {
        return CorsLayer::permissive();
    };

    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::HEAD,
                Method::PUT,
                Method::PATCH,
                Method::POST,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .allow_credentials(true),
        Err(e) => {
            tracing::warn!("Invalid CORS origin {:?}, allowing any origin: {}", origin, e);
            CorsLayer::permissive()
        }
    }
}

/// WebSocket upgrade handler
async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Query(handshake): Query<Handshake>,
    State(state): State<AppState>,
) -> Response {
    let session_id = handshake.session_id.unwrap_or_default();

    if session_id.is_empty() {
        if state.config().reject_empty_session_id {
            tracing::warn!("Rejecting connection without sessionId");
            return (StatusCode::BAD_REQUEST, "missing sessionId").into_response();
        }
        tracing::warn!("Connection without sessionId joins the empty session");
    }

    ws.on_upgrade(move |socket| handle_websocket(socket, state, session_id))
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub connections: usize,
    pub sessions: usize,
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connections: state.connection_count(),
        sessions: state.session_count(),
    })
}
