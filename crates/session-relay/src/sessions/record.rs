//! Session Record
//!
//! The fixed-shape metadata kept for every session identifier a client has
//! declared.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Identifier assigned by the server to every transport connection
pub type ConnectionId = Uuid;

/// Metadata for a single session
///
/// Fields are private so `started` can only move from `false` to `true`
/// through [`Session::start`]. Replacing a session always builds a new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: String,
    owner: ConnectionId,
    started: bool,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    last_activity: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(id: impl Into<String>, owner: ConnectionId) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            owner,
            started: false,
            created_at: now,
            started_at: None,
            last_activity: now,
        }
    }

    /// Session identifier (also the broadcast group name)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Connection that most recently registered this session
    pub fn owner(&self) -> ConnectionId {
        self.owner
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Time elapsed since the last activity, relative to `now`
    pub fn idle_for(&self, now: DateTime<Utc>) -> TimeDelta {
        now.signed_duration_since(self.last_activity)
    }

    /// Flip `started` to `true`. Returns `false` if it already was.
    pub(crate) fn start(&mut self) -> bool {
        self.touch();
        if self.started {
            return false;
        }
        self.started = true;
        self.started_at = Some(self.last_activity);
        true
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    #[cfg(test)]
    pub(crate) fn backdate(&mut self, by: TimeDelta) {
        self.last_activity -= by;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_not_started() {
        let owner = Uuid::new_v4();
        let session = Session::new("room1", owner);

        assert_eq!(session.id(), "room1");
        assert_eq!(session.owner(), owner);
        assert!(!session.is_started());
        assert!(session.started_at().is_none());
        assert_eq!(session.created_at(), session.last_activity());
    }

    #[test]
    fn test_start_only_transitions_once() {
        let mut session = Session::new("room1", Uuid::new_v4());

        assert!(session.start());
        let first_started_at = session.started_at();
        assert!(first_started_at.is_some());

        assert!(!session.start());
        assert!(session.is_started());
        assert_eq!(session.started_at(), first_started_at);
    }

    #[test]
    fn test_idle_for_tracks_backdated_activity() {
        let mut session = Session::new("room1", Uuid::new_v4());
        session.backdate(TimeDelta::seconds(90));

        assert!(session.idle_for(Utc::now()) >= TimeDelta::seconds(90));

        session.touch();
        assert!(session.idle_for(Utc::now()) < TimeDelta::seconds(90));
    }

    #[test]
    fn test_serializes_camel_case() {
        let session = Session::new("room1", Uuid::new_v4());
        let json = serde_json::to_value(&session).unwrap();

        assert_eq!(json["id"], "room1");
        assert_eq!(json["started"], false);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("lastActivity").is_some());
    }
}
