//! Broadcast Groups
//!
//! Transport-level rooms: each connection is bound to the group named after
//! its session identifier and receives every event emitted to that group
//! until it leaves.

use std::collections::HashMap;

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::protocol::ServerEvent;
use crate::sessions::ConnectionId;

/// Channel feeding a single connection's socket writer
pub type Outbound = mpsc::Sender<ServerEvent>;

/// Result of emitting one event to a group
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Members the event was queued for
    pub delivered: usize,
    /// Members whose queue was full or closed
    pub dropped: usize,
}

/// All groups with at least one member
#[derive(Debug, Default)]
pub struct Groups {
    rooms: DashMap<String, HashMap<ConnectionId, Outbound>>,
}

impl Groups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `connection_id` to `group`
    pub fn join(&self, group: &str, connection_id: ConnectionId, tx: Outbound) {
        self.rooms
            .entry(group.to_string())
            .or_default()
            .insert(connection_id, tx);
    }

    /// Unbind `connection_id` from `group`; empty groups are dropped
    pub fn leave(&self, group: &str, connection_id: ConnectionId) -> bool {
        let removed = match self.rooms.get_mut(group) {
            Some(mut room) => room.remove(&connection_id).is_some(),
            None => false,
        };
        self.rooms.remove_if(group, |_, room| room.is_empty());
        removed
    }

    /// Number of connections bound to `group`
    pub fn members(&self, group: &str) -> usize {
        self.rooms.get(group).map(|room| room.len()).unwrap_or(0)
    }

    pub fn is_occupied(&self, group: &str) -> bool {
        self.members(group) > 0
    }

    /// Total connections across all groups
    pub fn connection_count(&self) -> usize {
        self.rooms.iter().map(|room| room.len()).sum()
    }

    /// Queue `event` for every member of `group`
    ///
    /// Never blocks: a member whose queue is full or closed misses the event.
    pub fn emit(&self, group: &str, event: &ServerEvent) -> Delivery {
        let mut delivery = Delivery::default();

        let Some(room) = self.rooms.get(group) else {
            return delivery;
        };

        for (connection_id, tx) in room.iter() {
            match tx.try_send(event.clone()) {
                Ok(()) => delivery.delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        group = %group,
                        connection_id = %connection_id,
                        event = event.name(),
                        "Failed to queue event for connection: {}",
                        e
                    );
                    delivery.dropped += 1;
                }
            }
        }

        delivery
    }
}
