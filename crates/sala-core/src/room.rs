//! Room registry.
//!
//! Rooms are created by the first join and removed by the departure that
//! empties them, so a room that exists always has at least one member. A
//! later join of the same name starts a fresh room.
//!
//! The registry holds the room → members index. The member → room
//! back-pointer lives in each session's state; the driver updates both in
//! the same step.

use std::collections::{HashMap, HashSet};

use crate::SessionId;

/// Outcome of removing a member from a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// Member removed; the room still has members to notify
    Left,
    /// Member removed and the room, now empty, was deleted
    Closed,
    /// Session was not a member (nothing changed)
    NotMember,
}

/// Registry of rooms and their member sets.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    /// Room name → member sessions
    rooms: HashMap<String, HashSet<SessionId>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `session` to `room`, creating the room if needed.
    ///
    /// Returns `true` if the room was created by this call.
    pub fn join(&mut self, room: &str, session: SessionId) -> bool {
        match self.rooms.get_mut(room) {
            Some(members) => {
                members.insert(session);
                false
            },
            None => {
                self.rooms.insert(room.to_owned(), HashSet::from([session]));
                true
            },
        }
    }

    /// Remove `session` from `room`, deleting the room if it empties.
    pub fn leave(&mut self, room: &str, session: SessionId) -> Departure {
        let Some(members) = self.rooms.get_mut(room) else {
            return Departure::NotMember;
        };
        if !members.remove(&session) {
            return Departure::NotMember;
        }
        if members.is_empty() {
            self.rooms.remove(room);
            Departure::Closed
        } else {
            Departure::Left
        }
    }

    /// Current members of `room`, in no particular order.
    ///
    /// Empty if the room does not exist.
    pub fn members(&self, room: &str) -> impl Iterator<Item = SessionId> + '_ {
        self.rooms.get(room).into_iter().flatten().copied()
    }

    /// Whether `session` is a member of `room`.
    pub fn is_member(&self, room: &str, session: SessionId) -> bool {
        self.rooms.get(room).is_some_and(|members| members.contains(&session))
    }

    /// Whether `room` currently exists.
    pub fn contains(&self, room: &str) -> bool {
        self.rooms.contains_key(room)
    }

    /// All rooms with their member sets.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HashSet<SessionId>)> {
        self.rooms.iter().map(|(name, members)| (name.as_str(), members))
    }

    /// Number of existing rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
