//! Server Application State
//!
//! Shared state accessible by all WebSocket handlers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use uuid::Uuid;

use super::groups::{Delivery, Groups, Outbound};
use super::protocol::ServerEvent;
use crate::config::RelayConfig;
use crate::sessions::{ConnectionId, Registration, Session, SessionRegistry};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RelayConfig,

    /// Session metadata
    sessions: SessionRegistry,

    /// Connections grouped by session identifier
    groups: Groups,
}

impl AppState {
    /// Create new application state
    pub fn new(config: RelayConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                sessions: SessionRegistry::new(),
                groups: Groups::new(),
            }),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }

    pub fn groups(&self) -> &Groups {
        &self.inner.groups
    }

    /// Bind a new connection to `session_id` and register the session
    pub fn connect(&self, session_id: &str, tx: Outbound) -> (ConnectionId, Registration) {
        let connection_id = Uuid::new_v4();

        // Register before joining so an observed member always has a record.
        let registration = self.inner.sessions.register(
            session_id,
            connection_id,
            self.inner.config.reconnect_policy,
        );
        self.inner.groups.join(session_id, connection_id, tx);

        (connection_id, registration)
    }

    /// Release a connection's group membership
    ///
    /// The session record is left untouched.
    pub fn disconnect(&self, session_id: &str, connection_id: ConnectionId) {
        self.inner.groups.leave(session_id, connection_id);
    }

    /// Emit `event` to every connection bound to `session_id`
    pub fn emit(&self, session_id: &str, event: ServerEvent) -> Delivery {
        self.inner.groups.emit(session_id, &event)
    }

    /// Drop sessions idle for at least `ttl` with no bound connections
    pub fn expire_idle(&self, ttl: Duration) -> Vec<Session> {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        let groups = &self.inner.groups;
        self.inner
            .sessions
            .expire_idle(ttl, Utc::now(), |id| groups.is_occupied(id))
    }

    /// Number of open connections
    pub fn connection_count(&self) -> usize {
        self.inner.groups.connection_count()
    }

    /// Number of session records
    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_connect_registers_and_joins() {
        let state = AppState::new(RelayConfig::default());
        let (tx, _rx) = mpsc::channel(4);

        let (connection_id, registration) = state.connect("room1", tx);

        assert_eq!(registration, Registration::Created);
        assert_eq!(state.sessions().get("room1").unwrap().owner(), connection_id);
        assert_eq!(state.groups().members("room1"), 1);
        assert_eq!(state.connection_count(), 1);
        assert_eq!(state.session_count(), 1);
    }

    #[test]
    fn test_disconnect_keeps_session_record() {
        let state = AppState::new(RelayConfig::default());
        let (tx, _rx) = mpsc::channel(4);
        let (connection_id, _) = state.connect("room1", tx);

        state.disconnect("room1", connection_id);

        assert_eq!(state.connection_count(), 0);
        assert!(state.sessions().get("room1").is_some());
    }

    #[test]
    fn test_expire_idle_only_removes_abandoned_sessions() {
        let state = AppState::new(RelayConfig::default());
        let (tx_a, _rx_a) = mpsc::channel(4);
        let (tx_b, _rx_b) = mpsc::channel(4);
        let (left, _) = state.connect("abandoned", tx_a);
        state.connect("active", tx_b);
        state.disconnect("abandoned", left);

        state.sessions().backdate("abandoned", TimeDelta::minutes(5));
        state.sessions().backdate("active", TimeDelta::minutes(5));

        let expired = state.expire_idle(Duration::from_secs(60));

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id(), "abandoned");
        assert!(state.sessions().contains("active"));
    }
}
