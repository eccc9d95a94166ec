//! Per-connection session state.
//!
//! # Lifecycle
//!
//! ```text
//! ┌──────┐  /nick   ┌─────────┐  /join   ┌────────┐
//! │ Init │─────────>│ Outside │─────────>│ Inside │──┐ /join (leave, then join)
//! └──────┘          └─────────┘<─────────└────────┘<─┘
//!                                /leave
//! ```
//!
//! `/bye`, end of stream, and fatal framing errors end the session from any
//! state. The nickname and room are carried by the state variants, so a
//! session cannot name a room unless it is `Inside` one.

use std::fmt;

use sala_proto::LineFramer;

use crate::SessionId;

/// Lifecycle phase of a session, without the data each phase carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lifecycle {
    /// Connected, no nickname yet
    Init,
    /// Has a nickname, not in a room
    Outside,
    /// Has a nickname and is a member of one room
    Inside,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Init => "init",
            Self::Outside => "outside",
            Self::Inside => "inside",
        })
    }
}

/// Where a session is in the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no nickname yet
    Init,

    /// Nickname bound, not in a room
    Outside {
        /// Bound nickname
        nickname: String,
    },

    /// Nickname bound and member of `room`
    Inside {
        /// Bound nickname
        nickname: String,
        /// Room the session belongs to
        room: String,
    },
}

impl SessionState {
    /// Phase without data.
    pub fn lifecycle(&self) -> Lifecycle {
        match self {
            Self::Init => Lifecycle::Init,
            Self::Outside { .. } => Lifecycle::Outside,
            Self::Inside { .. } => Lifecycle::Inside,
        }
    }

    /// Bound nickname, if any.
    pub fn nickname(&self) -> Option<&str> {
        match self {
            Self::Init => None,
            Self::Outside { nickname } | Self::Inside { nickname, .. } => Some(nickname),
        }
    }

    /// Current room, if any.
    pub fn room(&self) -> Option<&str> {
        match self {
            Self::Inside { room, .. } => Some(room),
            _ => None,
        }
    }
}

/// Server-side state for one connected client.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    state: SessionState,
    /// Partial input waiting for its line terminator
    framer: LineFramer,
}

impl Session {
    /// Create a session in [`SessionState::Init`].
    pub fn new(id: SessionId, max_line_length: usize) -> Self {
        Self { id, state: SessionState::Init, framer: LineFramer::with_max_line_length(max_line_length) }
    }

    /// Runtime-assigned identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current protocol state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current lifecycle phase.
    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lifecycle()
    }

    /// Bound nickname, if any.
    pub fn nickname(&self) -> Option<&str> {
        self.state.nickname()
    }

    /// Current room, if any.
    pub fn room(&self) -> Option<&str> {
        self.state.room()
    }

    /// Bytes buffered toward an unterminated line.
    pub fn pending_input(&self) -> usize {
        self.framer.pending()
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    pub(crate) fn framer_mut(&mut self) -> &mut LineFramer {
        &mut self.framer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_in_init() {
        let session = Session::new(7, 1024);
        assert_eq!(session.id(), 7);
        assert_eq!(session.lifecycle(), Lifecycle::Init);
        assert_eq!(session.nickname(), None);
        assert_eq!(session.room(), None);
    }

    #[test]
    fn room_only_visible_inside() {
        let outside = SessionState::Outside { nickname: "alice".into() };
        assert_eq!(outside.nickname(), Some("alice"));
        assert_eq!(outside.room(), None);

        let inside = SessionState::Inside { nickname: "alice".into(), room: "lobby".into() };
        assert_eq!(inside.lifecycle(), Lifecycle::Inside);
        assert_eq!(inside.room(), Some("lobby"));
    }
}
