//! Idle Session Sweeper
//!
//! Periodically drops sessions that have no connections and have seen no
//! activity for the configured time-to-live.

use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};

use super::state::AppState;

/// Run the sweep loop forever
pub async fn run_sweeper(state: AppState, ttl: Duration, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        ttl_secs = ttl.as_secs(),
        every_secs = every.as_secs(),
        "Idle session sweeper started"
    );

    loop {
        ticker.tick().await;
        sweep(&state, ttl);
    }
}

/// Run a single sweep, returning how many sessions were removed
pub fn sweep(state: &AppState, ttl: Duration) -> usize {
    let expired = state.expire_idle(ttl);

    for session in &expired {
        tracing::info!(
            session_id = %session.id(),
            owner = %session.owner(),
            started = session.is_started(),
            last_activity = %session.last_activity(),
            "Expired idle session"
        );
    }

    expired.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use chrono::TimeDelta;
    use tokio::sync::mpsc;

    #[test]
    fn test_sweep_removes_abandoned_session() {
        let state = AppState::new(RelayConfig::default());
        let (tx, _rx) = mpsc::channel(1);
        let (connection_id, _) = state.connect("room1", tx);
        state.disconnect("room1", connection_id);

        assert_eq!(sweep(&state, Duration::from_secs(60)), 0);

        state.sessions().backdate("room1", TimeDelta::minutes(2));
        assert_eq!(sweep(&state, Duration::from_secs(60)), 1);
        assert_eq!(state.session_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_loop_runs_on_interval() {
        let state = AppState::new(RelayConfig::default());
        let (tx, _rx) = mpsc::channel(1);
        let (connection_id, _) = state.connect("room1", tx);
        state.disconnect("room1", connection_id);

        let handle = tokio::spawn(run_sweeper(
            state.clone(),
            Duration::ZERO,
            Duration::from_secs(30),
        ));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(state.session_count(), 0);
        handle.abort();
    }
}
