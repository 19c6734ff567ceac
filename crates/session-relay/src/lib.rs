//! Session Relay
//!
//! Real-time relay for multiplayer and remote-control clients:
//! - Session registry tracking which sessions exist and whether they started
//! - WebSocket dispatcher binding each connection to its session group
//! - Broadcast relay fanning client events out to the whole group

pub mod config;
pub mod error;

// Session metadata
pub mod sessions;

// WebSocket server
pub mod server;

pub use error::{RelayError, Result};
