//! WebSocket Connection Handler
//!
//! Binds each new connection to its session group, registers the session,
//! and pumps frames between the socket and the relay.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::protocol::ServerEvent;
use super::relay;
use super::state::AppState;
use crate::sessions::{ConnectionId, Registration};

/// Handle a WebSocket connection for `session_id`
pub async fn handle_websocket(socket: WebSocket, state: AppState, session_id: String) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Create channel for sending events to this client
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(state.config().client_buffer);

    let (connection_id, registration) = state.connect(&session_id, tx);
    log_registration(&session_id, connection_id, &registration);

    // Forward queued events to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event.to_frame() {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to encode {} event: {}", event.name(), e);
                }
            }
        }
    });

    // Process incoming frames in arrival order
    let state_clone = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Text(text) => {
                    relay::handle_text(&state_clone, connection_id, &text);
                }
                Message::Close(_) => {
                    break;
                }
                Message::Ping(_data) => {
                    // Pong is handled automatically by axum
                    tracing::trace!("Received ping from {}", connection_id);
                }
                Message::Binary(_) => {
                    tracing::debug!(connection_id = %connection_id, "Ignoring binary frame");
                }
                _ => {}
            }
        }
    });

    // The writer keeps draining after the reader stops, so frames already
    // queued for this connection still go out.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => {},
    }

    state.disconnect(&session_id, connection_id);
    tracing::info!(
        session_id = %session_id,
        connection_id = %connection_id,
        "Client disconnected"
    );
}

fn log_registration(session_id: &str, connection_id: ConnectionId, registration: &Registration) {
    match registration {
        Registration::Created => {
            tracing::info!(
                session_id = %session_id,
                connection_id = %connection_id,
                "Client connected, session created"
            );
        }
        Registration::Replaced { previous } => {
            tracing::info!(
                session_id = %session_id,
                connection_id = %connection_id,
                previous_owner = %previous.owner(),
                was_started = previous.is_started(),
                "Client connected, session replaced"
            );
        }
        Registration::Preserved { owner } => {
            tracing::info!(
                session_id = %session_id,
                connection_id = %connection_id,
                owner = %owner,
                "Client connected, joined existing session"
            );
        }
    }
}
