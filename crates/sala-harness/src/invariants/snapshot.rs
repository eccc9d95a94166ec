//! Observable state snapshots for invariant checking.
//!
//! Snapshots copy the driver's state into plain ordered collections so
//! invariants run against a consistent view and produce deterministic
//! messages.

use std::collections::{BTreeMap, BTreeSet};

use sala_core::{ChatDriver, Lifecycle, SessionId};

/// Snapshot of the whole server.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Every live session, sorted by id.
    pub sessions: Vec<SessionSnapshot>,
    /// Room name → member ids, as the room registry sees it.
    pub rooms: BTreeMap<String, BTreeSet<SessionId>>,
    /// Nickname → session id, as the nickname registry sees it.
    pub nicknames: BTreeMap<String, SessionId>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no sessions).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture the driver's current state.
    pub fn from_driver(driver: &ChatDriver) -> Self {
        let mut sessions: Vec<SessionSnapshot> = driver
            .sessions()
            .map(|s| SessionSnapshot {
                id: s.id(),
                lifecycle: s.lifecycle(),
                nickname: s.nickname().map(str::to_owned),
                room: s.room().map(str::to_owned),
            })
            .collect();
        sessions.sort_by_key(|s| s.id);

        let rooms = driver
            .rooms()
            .iter()
            .map(|(name, members)| (name.to_owned(), members.iter().copied().collect()))
            .collect();
        let nicknames = driver.nicknames().iter().map(|(nick, id)| (nick.to_owned(), id)).collect();

        Self { sessions, rooms, nicknames }
    }

    /// Session with the given id.
    pub fn session(&self, id: SessionId) -> Option<&SessionSnapshot> {
        self.sessions.iter().find(|s| s.id == id)
    }
}

/// Snapshot of a single session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub id: SessionId,
    /// Lifecycle phase.
    pub lifecycle: Lifecycle,
    /// Bound nickname.
    pub nickname: Option<String>,
    /// Current room.
    pub room: Option<String>,
}
