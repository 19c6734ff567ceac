//! Session Registry
//!
//! In-memory store of session records keyed by session identifier. The
//! registry only tracks metadata; which connections belong to a session is
//! tracked by the server's broadcast groups.

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};

use super::record::{ConnectionId, Session};

/// What to do when a connection declares an identifier that is already
/// registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectPolicy {
    /// Latest connection wins: the record is rebuilt with the new owner and
    /// `started = false`
    #[default]
    Replace,
    /// Keep the existing record and only refresh its activity timestamp
    Preserve,
}

/// Result of registering a connection against a session identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// No record existed for the identifier
    Created,
    /// A record existed and was discarded
    Replaced { previous: Session },
    /// A record existed and was kept as is
    Preserved { owner: ConnectionId },
}

/// Result of [`SessionRegistry::mark_started`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyStarted,
    NotFound,
}

/// Registry of all sessions seen by this process
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh `{owner, started: false}` record at `id`, discarding
    /// whatever was there. Returns the discarded record.
    pub fn create_or_replace(&self, id: &str, owner: ConnectionId) -> Option<Session> {
        self.sessions.insert(id.to_string(), Session::new(id, owner))
    }

    /// Register `owner` against `id` according to `policy`
    pub fn register(&self, id: &str, owner: ConnectionId, policy: ReconnectPolicy) -> Registration {
        match policy {
            ReconnectPolicy::Replace => match self.create_or_replace(id, owner) {
                Some(previous) => Registration::Replaced { previous },
                None => Registration::Created,
            },
            ReconnectPolicy::Preserve => match self.sessions.entry(id.to_string()) {
                Entry::Occupied(mut entry) => {
                    entry.get_mut().touch();
                    Registration::Preserved {
                        owner: entry.get().owner(),
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(Session::new(id, owner));
                    Registration::Created
                }
            },
        }
    }

    /// Mark the session at `id` as started
    ///
    /// An unknown identifier is not an error and does not create a record.
    pub fn mark_started(&self, id: &str) -> StartOutcome {
        match self.sessions.get_mut(id) {
            Some(mut session) => {
                if session.start() {
                    StartOutcome::Started
                } else {
                    StartOutcome::AlreadyStarted
                }
            }
            None => StartOutcome::NotFound,
        }
    }

    /// Snapshot of the record at `id`
    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.get(id).map(|session| session.value().clone())
    }

    /// Refresh the activity timestamp. Returns `false` for unknown ids.
    pub fn touch(&self, id: &str) -> bool {
        match self.sessions.get_mut(id) {
            Some(mut session) => {
                session.touch();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &str) -> Option<Session> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// All records, ordered by identifier
    pub fn snapshot(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        sessions.sort_by(|a, b| a.id().cmp(b.id()));
        sessions
    }

    /// Remove every record idle for at least `ttl` whose group is not
    /// occupied. Returns the removed records.
    pub fn expire_idle(
        &self,
        ttl: TimeDelta,
        now: DateTime<Utc>,
        is_occupied: impl Fn(&str) -> bool,
    ) -> Vec<Session> {
        // Collect first: removing while iterating would deadlock on the shard lock.
        let candidates: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().idle_for(now) >= ttl)
            .map(|entry| entry.key().clone())
            .collect();

        candidates
            .into_iter()
            .filter_map(|id| {
                self.sessions
                    .remove_if(&id, |key, session| {
                        session.idle_for(now) >= ttl && !is_occupied(key.as_str())
                    })
                    .map(|(_, session)| session)
            })
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn backdate(&self, id: &str, by: TimeDelta) {
        if let Some(mut session) = self.sessions.get_mut(id) {
            session.backdate(by);
        }
    }
}
