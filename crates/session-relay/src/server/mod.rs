//! WebSocket Server
//!
//! Accepts client connections, binds them to session groups, and relays
//! events between members of the same session.

mod groups;
mod handler;
mod protocol;
pub mod relay;
mod router;
mod state;
mod sweeper;

pub use groups::*;
pub use handler::*;
pub use protocol::*;
pub use router::*;
pub use state::*;
pub use sweeper::*;
