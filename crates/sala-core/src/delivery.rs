//! Delivery planning.
//!
//! Command handlers never touch sockets. They record what should be sent to
//! whom in an [`Outbox`], which becomes the driver's list of
//! [`ServerAction`]s. Broadcast recipients are resolved when the broadcast
//! is recorded, so a later membership change within the same command (for
//! example the join half of `/join` while inside a room) cannot re-target an
//! earlier notice.

use sala_proto::Reply;

use crate::{
    SessionId,
    driver::{LogLevel, ServerAction},
    room::RoomRegistry,
};

/// Ordered collection of actions produced while handling one event.
#[derive(Debug, Default)]
pub struct Outbox {
    actions: Vec<ServerAction>,
}

impl Outbox {
    /// Create an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `reply` for a single session.
    pub fn send(&mut self, session_id: SessionId, reply: Reply) {
        self.actions.push(ServerAction::SendToSession { session_id, reply });
    }

    /// Queue `reply` for every current member of `room` except `exclude`.
    ///
    /// Recipients are snapshotted now, sorted by id. Nothing is queued when
    /// no one would receive the line.
    pub fn broadcast(
        &mut self,
        rooms: &RoomRegistry,
        room: &str,
        reply: Reply,
        exclude: Option<SessionId>,
    ) {
        let mut recipients: Vec<SessionId> =
            rooms.members(room).filter(|id| Some(*id) != exclude).collect();
        if recipients.is_empty() {
            return;
        }
        recipients.sort_unstable();
        self.actions.push(ServerAction::BroadcastToRoom { room: room.to_owned(), recipients, reply });
    }

    /// Queue closing a connection. Lines queued before this still go out.
    pub fn close(&mut self, session_id: SessionId, reason: impl Into<String>) {
        self.actions.push(ServerAction::CloseConnection { session_id, reason: reason.into() });
    }

    /// Queue a log line for the runtime.
    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.actions.push(ServerAction::Log { level, message: message.into() });
    }

    /// Whether nothing has been queued.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Consume the outbox, yielding actions in the order they were queued.
    pub fn into_actions(self) -> Vec<ServerAction> {
        self.actions
    }
}
