//! Broadcast Relay
//!
//! Maps inbound client events to session-scoped fan-out. The target session
//! is always the `sessionId` carried by the event, not the sender's own
//! group, and the sender receives its own broadcast when it is a member.

use tracing::{debug, info, warn};

use super::groups::Delivery;
use super::protocol::{ClientEvent, ServerEvent};
use super::state::AppState;
use crate::error::Result;
use crate::sessions::{ConnectionId, StartOutcome};

/// Decode a text frame into a client event
pub fn decode(text: &str) -> Result<ClientEvent> {
    Ok(serde_json::from_str(text)?)
}

/// Handle one inbound text frame
///
/// Frames that fail to decode are logged and dropped; the client is not told.
pub fn handle_text(state: &AppState, connection_id: ConnectionId, text: &str) -> Option<Delivery> {
    match decode(text) {
        Ok(event) => Some(dispatch(state, connection_id, event)),
        Err(e) => {
            warn!(connection_id = %connection_id, "Dropping client frame: {}", e);
            None
        }
    }
}

/// Apply a client event and fan the resulting server event out
pub fn dispatch(state: &AppState, connection_id: ConnectionId, event: ClientEvent) -> Delivery {
    let name = event.name();
    state.sessions().touch(event.session_id());

    let (session_id, outbound) = match event {
        ClientEvent::StartGame { session_id } => {
            match state.sessions().mark_started(&session_id) {
                StartOutcome::Started => {
                    info!(session_id = %session_id, connection_id = %connection_id, "Session started");
                }
                StartOutcome::AlreadyStarted => {
                    debug!(session_id = %session_id, "Session already started");
                }
                StartOutcome::NotFound => {
                    debug!(session_id = %session_id, "Start requested for unknown session");
                }
            }
            (session_id, ServerEvent::GameStarted)
        }
        ClientEvent::Control { action, session_id } => {
            debug!(session_id = %session_id, action = %action, "Relaying control action");
            (session_id, ServerEvent::GameAction(action))
        }
        ClientEvent::TestMessage {
            message,
            session_id,
        } => {
            info!(session_id = %session_id, message = %message, "Test message received");
            (
                session_id,
                ServerEvent::response_message(state.config().ack_message.clone()),
            )
        }
    };

    let delivery = state.emit(&session_id, outbound);
    debug!(
        session_id = %session_id,
        connection_id = %connection_id,
        event = name,
        delivered = delivery.delivered,
        dropped = delivery.dropped,
        "Relayed event"
    );
    delivery
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::server::DEFAULT_ACK_MESSAGE;
    use tokio::sync::mpsc;

    fn member(state: &AppState, session_id: &str) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let (connection_id, _) = state.connect(session_id, tx);
        (connection_id, rx)
    }

    #[test]
    fn test_start_game_marks_started_and_notifies_group() {
        let state = AppState::new(RelayConfig::default());
        let (c1, mut rx1) = member(&state, "room1");
        let (_c2, mut rx2) = member(&state, "room1");

        let delivery = dispatch(
            &state,
            c1,
            ClientEvent::StartGame {
                session_id: "room1".to_string(),
            },
        );

        assert_eq!(delivery.delivered, 2);
        assert!(state.sessions().get("room1").unwrap().is_started());
        assert_eq!(rx1.try_recv().unwrap(), ServerEvent::GameStarted);
        assert_eq!(rx2.try_recv().unwrap(), ServerEvent::GameStarted);
    }

    #[test]
    fn test_start_game_for_unknown_session_still_broadcasts() {
        let state = AppState::new(RelayConfig::default());
        let (c1, _rx1) = member(&state, "room1");

        let delivery = dispatch(
            &state,
            c1,
            ClientEvent::StartGame {
                session_id: "ghost".to_string(),
            },
        );

        assert_eq!(delivery, Delivery::default());
        assert!(state.sessions().get("ghost").is_none());
    }

    #[test]
    fn test_control_reaches_only_target_group() {
        let state = AppState::new(RelayConfig::default());
        let (sender, mut rx_sender) = member(&state, "A");
        let (_peer, mut rx_peer) = member(&state, "A");
        let (_other, mut rx_other) = member(&state, "B");

        dispatch(
            &state,
            sender,
            ClientEvent::Control {
                action: "jump".to_string(),
                session_id: "A".to_string(),
            },
        );

        assert_eq!(rx_sender.try_recv().unwrap(), ServerEvent::game_action("jump"));
        assert_eq!(rx_peer.try_recv().unwrap(), ServerEvent::game_action("jump"));
        assert!(rx_other.try_recv().is_err());
    }

    #[test]
    fn test_payload_session_id_overrides_sender_group() {
        let state = AppState::new(RelayConfig::default());
        let (sender, mut rx_sender) = member(&state, "A");
        let (_peer, mut rx_peer) = member(&state, "B");

        dispatch(
            &state,
            sender,
            ClientEvent::Control {
                action: "left".to_string(),
                session_id: "B".to_string(),
            },
        );

        assert!(rx_sender.try_recv().is_err());
        assert_eq!(rx_peer.try_recv().unwrap(), ServerEvent::game_action("left"));
    }

    #[test]
    fn test_test_message_ack_is_constant() {
        let state = AppState::new(RelayConfig::default());
        let (c1, mut rx) = member(&state, "room1");

        for message in ["hello", "", "something else entirely"] {
            dispatch(
                &state,
                c1,
                ClientEvent::TestMessage {
                    message: message.to_string(),
                    session_id: "room1".to_string(),
                },
            );
            assert_eq!(
                rx.try_recv().unwrap(),
                ServerEvent::response_message(DEFAULT_ACK_MESSAGE)
            );
        }
    }

    #[test]
    fn test_relay_preserves_per_connection_order() {
        let state = AppState::new(RelayConfig::default());
        let (c1, mut rx) = member(&state, "room1");

        for action in ["up", "down", "left", "right"] {
            handle_text(
                &state,
                c1,
                &format!(r#"{{"event":"control","data":{{"action":"{action}","sessionId":"room1"}}}}"#),
            );
        }

        let received: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            received,
            ["up", "down", "left", "right"]
                .map(|action| ServerEvent::GameAction(action.to_string()))
                .to_vec()
        );
    }

    #[test]
    fn test_malformed_frame_is_dropped() {
        let state = AppState::new(RelayConfig::default());
        let (c1, mut rx) = member(&state, "room1");

        assert!(handle_text(&state, c1, "{not json").is_none());
        assert!(handle_text(&state, c1, r#"{"event":"unknown"}"#).is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_reconnect_scenario_overwrites_session() {
        let state = AppState::new(RelayConfig::default());
        let (c1, mut rx1) = member(&state, "room1");

        let session = state.sessions().get("room1").unwrap();
        assert_eq!(session.owner(), c1);
        assert!(!session.is_started());

        handle_text(&state, c1, r#"{"event":"startGame","data":{"sessionId":"room1"}}"#);
        assert!(state.sessions().get("room1").unwrap().is_started());
        assert_eq!(rx1.try_recv().unwrap(), ServerEvent::GameStarted);

        let (c2, _rx2) = member(&state, "room1");
        let session = state.sessions().get("room1").unwrap();
        assert_eq!(session.owner(), c2);
        assert!(!session.is_started());
    }
}
