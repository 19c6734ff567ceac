//! WebSocket Protocol Events
//!
//! Every frame is a JSON text message of the form
//! `{"event": "<name>", "data": <payload>}`. Events without a payload omit
//! `data`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Payload of `responseMessage` unless configured otherwise
pub const DEFAULT_ACK_MESSAGE: &str = "Mensagem recebida pelo backend!";

/// Events sent from client to server
///
/// Each event names the session it targets. A missing `sessionId` addresses
/// the empty-string session, the same group a connection without handshake
/// metadata joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Mark the session started and notify its members
    StartGame {
        #[serde(rename = "sessionId", default)]
        session_id: String,
    },

    /// Relay a control action to the session
    Control {
        action: String,
        #[serde(rename = "sessionId", default)]
        session_id: String,
    },

    /// Connectivity check; answered with a fixed acknowledgement
    TestMessage {
        #[serde(default)]
        message: String,
        #[serde(rename = "sessionId", default)]
        session_id: String,
    },
}

impl ClientEvent {
    /// Session the event is addressed to
    pub fn session_id(&self) -> &str {
        match self {
            Self::StartGame { session_id }
            | Self::Control { session_id, .. }
            | Self::TestMessage { session_id, .. } => session_id,
        }
    }

    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartGame { .. } => "startGame",
            Self::Control { .. } => "control",
            Self::TestMessage { .. } => "testMessage",
        }
    }
}

/// Events sent from server to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// The session has started
    GameStarted,

    /// Raw action string from a `control` event
    GameAction(String),

    /// Acknowledgement of a `testMessage`
    ResponseMessage { message: String },
}

impl ServerEvent {
    pub fn game_action(action: impl Into<String>) -> Self {
        Self::GameAction(action.into())
    }

    pub fn response_message(message: impl Into<String>) -> Self {
        Self::ResponseMessage {
            message: message.into(),
        }
    }

    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Self::GameStarted => "gameStarted",
            Self::GameAction(_) => "gameAction",
            Self::ResponseMessage { .. } => "responseMessage",
        }
    }

    /// Encode as a text frame
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
