//! Chat driver.
//!
//! Ties together per-connection sessions, the nickname registry, and the
//! room registry. The runtime reports what happened on the network as
//! [`ServerEvent`]s; the driver applies the protocol and answers with
//! [`ServerAction`]s for the runtime to execute.
//!
//! Incoming bytes are framed per session and each complete line is handled
//! to completion before the next one is taken from the framer. A line that
//! closes the session (`/bye`) discards whatever follows it in the same read.

use std::collections::HashMap;

use bytes::Bytes;
use sala_proto::{Command, DEFAULT_MAX_LINE_LENGTH, Reply, unescape_incoming};

use crate::{
    SessionId,
    delivery::Outbox,
    error::{CommandError, DriverError},
    registry::SessionRegistry,
    room::{Departure, RoomRegistry},
    session::{Session, SessionState},
};

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Maximum concurrent sessions; further connections are closed on accept
    pub max_connections: usize,
    /// Longest accepted input line in bytes
    pub max_line_length: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { max_connections: 10_000, max_line_length: DEFAULT_MAX_LINE_LENGTH }
    }
}

/// Events the driver processes.
///
/// Produced by the runtime (production or simulation).
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new connection was accepted
    ConnectionAccepted {
        /// Identifier assigned by the runtime, unique among live sessions
        session_id: SessionId,
    },

    /// Bytes arrived on a connection
    BytesReceived {
        /// Connection the bytes came from
        session_id: SessionId,
        /// Raw bytes, in arrival order, with no framing applied
        data: Bytes,
    },

    /// A connection ended (peer closed, read or write failure)
    ConnectionClosed {
        /// Connection that ended
        session_id: SessionId,
        /// Reason for closure
        reason: String,
    },
}

/// Actions the driver produces.
///
/// Executed in order by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAction {
    /// Write a line to one session
    SendToSession {
        /// Target session
        session_id: SessionId,
        /// Line to write
        reply: Reply,
    },

    /// Write the same line to several members of a room
    BroadcastToRoom {
        /// Room the line concerns
        room: String,
        /// Members resolved when the broadcast was produced, sender excluded
        recipients: Vec<SessionId>,
        /// Line to write
        reply: Reply,
    },

    /// Flush queued lines, then close the connection
    CloseConnection {
        /// Session to close
        session_id: SessionId,
        /// Reason for closure
        reason: String,
    },

    /// Emit a log line
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
    },
}

/// Log levels for driver actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

/// Action-based chat server driver.
///
/// Owns every session and both registries. Not shared across tasks: the
/// runtime serializes all events through one owner.
#[derive(Debug)]
pub struct ChatDriver {
    /// Live sessions (`session_id` → session)
    sessions: HashMap<SessionId, Session>,
    /// Nickname → session
    nicknames: SessionRegistry,
    /// Room → members
    rooms: RoomRegistry,
    config: DriverConfig,
}

impl Default for ChatDriver {
    fn default() -> Self {
        Self::new(DriverConfig::default())
    }
}

impl ChatDriver {
    /// Create a driver with no sessions.
    pub fn new(config: DriverConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            nicknames: SessionRegistry::new(),
            rooms: RoomRegistry::new(),
            config,
        }
    }

    /// Process an event and return the actions to execute.
    ///
    /// This is the driver's only mutating entry point.
    ///
    /// # Errors
    ///
    /// - [`DriverError::DuplicateSession`] if an accepted id is still live
    /// - [`DriverError::SessionNotFound`] if bytes arrive for a session that
    ///   is not live (for example, data read after `/bye`)
    ///
    /// Closing an unknown session is not an error; teardown is idempotent.
    pub fn process_event(&mut self, event: ServerEvent) -> Result<Vec<ServerAction>, DriverError> {
        match event {
            ServerEvent::ConnectionAccepted { session_id } => {
                self.handle_connection_accepted(session_id)
            },
            ServerEvent::BytesReceived { session_id, data } => {
                self.handle_bytes_received(session_id, &data)
            },
            ServerEvent::ConnectionClosed { session_id, reason } => {
                let mut out = Outbox::new();
                self.disconnect(session_id, &reason, None, &mut out);
                Ok(out.into_actions())
            },
        }
    }

    /// Session by id.
    pub fn session(&self, session_id: SessionId) -> Option<&Session> {
        self.sessions.get(&session_id)
    }

    /// All live sessions, in no particular order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Nickname registry.
    pub fn nicknames(&self) -> &SessionRegistry {
        &self.nicknames
    }

    /// Room registry.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Driver configuration.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    fn handle_connection_accepted(
        &mut self,
        session_id: SessionId,
    ) -> Result<Vec<ServerAction>, DriverError> {
        if self.sessions.contains_key(&session_id) {
            return Err(DriverError::DuplicateSession(session_id));
        }

        let mut out = Outbox::new();
        if self.sessions.len() >= self.config.max_connections {
            out.log(
                LogLevel::Warn,
                format!(
                    "rejecting session {session_id}: {} connections open",
                    self.config.max_connections
                ),
            );
            out.close(session_id, "connection limit reached");
            return Ok(out.into_actions());
        }

        self.sessions.insert(session_id, Session::new(session_id, self.config.max_line_length));
        out.log(LogLevel::Info, format!("session {session_id} opened"));
        Ok(out.into_actions())
    }

    fn handle_bytes_received(
        &mut self,
        session_id: SessionId,
        data: &[u8],
    ) -> Result<Vec<ServerAction>, DriverError> {
        let session =
            self.sessions.get_mut(&session_id).ok_or(DriverError::SessionNotFound(session_id))?;
        session.framer_mut().extend(data);

        let mut out = Outbox::new();
        // Re-fetch each time: a line may have closed the session
        while let Some(session) = self.sessions.get_mut(&session_id) {
            let Some(next) = session.framer_mut().next_line() else { break };
            match next {
                Ok(line) => self.handle_line(session_id, &line, &mut out),
                Err(err) => {
                    out.log(LogLevel::Warn, format!("session {session_id}: {err}"));
                    self.disconnect(session_id, &err.to_string(), None, &mut out);
                },
            }
        }
        Ok(out.into_actions())
    }

    fn handle_line(&mut self, session_id: SessionId, line: &str, out: &mut Outbox) {
        let Some(state) = self.sessions.get(&session_id).map(|s| s.state().clone()) else {
            return;
        };
        out.log(LogLevel::Debug, format!("session {session_id} ({}): {line}", state.lifecycle()));

        let result = match Command::parse(line) {
            Ok(command) => self.dispatch(session_id, &state, command, out),
            Err(missing) => Err(CommandError::from(missing)),
        };

        if let Err(err) = result {
            out.send(session_id, err.to_reply());
        }
    }

    fn dispatch(
        &mut self,
        session_id: SessionId,
        state: &SessionState,
        command: Command<'_>,
        out: &mut Outbox,
    ) -> Result<(), CommandError> {
        match command {
            Command::Nick { name } => self.handle_nick(session_id, state, name, out),
            Command::Join { room } => self.handle_join(session_id, state, room, out),
            Command::Leave => self.handle_leave(session_id, state, out),
            Command::Priv { target, text } => self.handle_priv(session_id, state, target, text, out),
            Command::Bye => {
                self.disconnect(session_id, "client said goodbye", Some(Reply::Bye), out);
                Ok(())
            },
            Command::Message { text } => {
                self.handle_room_text(session_id, state, text, CommandError::NotInRoom, out)
            },
            Command::Unrecognized { line } => {
                self.handle_room_text(session_id, state, line, CommandError::UnsupportedCommand, out)
            },
        }
    }

    fn handle_nick(
        &mut self,
        session_id: SessionId,
        state: &SessionState,
        name: &str,
        out: &mut Outbox,
    ) -> Result<(), CommandError> {
        match state {
            SessionState::Init => {
                self.nicknames.register(name, session_id)?;
                self.set_state(session_id, SessionState::Outside { nickname: name.to_owned() });
            },
            SessionState::Outside { nickname } => {
                self.nicknames.rename(nickname, name, session_id)?;
                self.set_state(session_id, SessionState::Outside { nickname: name.to_owned() });
            },
            SessionState::Inside { nickname, room } => {
                self.nicknames.rename(nickname, name, session_id)?;
                self.set_state(
                    session_id,
                    SessionState::Inside { nickname: name.to_owned(), room: room.clone() },
                );
                out.broadcast(
                    &self.rooms,
                    room,
                    Reply::NewNick { old: nickname.clone(), new: name.to_owned() },
                    Some(session_id),
                );
            },
        }
        out.send(session_id, Reply::Ok);
        Ok(())
    }

    fn handle_join(
        &mut self,
        session_id: SessionId,
        state: &SessionState,
        room: &str,
        out: &mut Outbox,
    ) -> Result<(), CommandError> {
        let nickname = match state {
            SessionState::Init => return Err(CommandError::InvalidState),
            SessionState::Outside { nickname } => nickname,
            SessionState::Inside { nickname, room: current } => {
                self.leave_room(session_id, nickname, current, out);
                nickname
            },
        };

        if self.rooms.join(room, session_id) {
            out.log(LogLevel::Debug, format!("room {room} created"));
        }
        self.set_state(
            session_id,
            SessionState::Inside { nickname: nickname.clone(), room: room.to_owned() },
        );
        out.broadcast(&self.rooms, room, Reply::Joined { nick: nickname.clone() }, Some(session_id));
        out.send(session_id, Reply::Ok);
        Ok(())
    }

    fn handle_leave(
        &mut self,
        session_id: SessionId,
        state: &SessionState,
        out: &mut Outbox,
    ) -> Result<(), CommandError> {
        let SessionState::Inside { nickname, room } = state else {
            return Err(CommandError::NotInRoom);
        };

        self.leave_room(session_id, nickname, room, out);
        self.set_state(session_id, SessionState::Outside { nickname: nickname.clone() });
        out.send(session_id, Reply::Ok);
        Ok(())
    }

    fn handle_priv(
        &mut self,
        session_id: SessionId,
        state: &SessionState,
        target: &str,
        text: &str,
        out: &mut Outbox,
    ) -> Result<(), CommandError> {
        let Some(nickname) = state.nickname() else {
            return Err(CommandError::InvalidState);
        };
        let target_id = self.nicknames.lookup(target).ok_or(CommandError::TargetNotFound)?;

        out.send(target_id, Reply::Private { from: nickname.to_owned(), text: text.to_owned() });
        out.send(session_id, Reply::Ok);
        Ok(())
    }

    /// Relay plain text (or an unrecognized `/command`) to the sender's room.
    ///
    /// Outside a room the line is rejected with `outside_error`.
    fn handle_room_text(
        &mut self,
        session_id: SessionId,
        state: &SessionState,
        text: &str,
        outside_error: CommandError,
        out: &mut Outbox,
    ) -> Result<(), CommandError> {
        let SessionState::Inside { nickname, room } = state else {
            return Err(outside_error);
        };

        let reply =
            Reply::Message { from: nickname.clone(), text: unescape_incoming(text).to_owned() };
        out.broadcast(&self.rooms, room, reply, Some(session_id));
        Ok(())
    }

    /// Remove a session from its room and notify whoever remains.
    ///
    /// Does not touch the session's state; callers set it.
    fn leave_room(&mut self, session_id: SessionId, nickname: &str, room: &str, out: &mut Outbox) {
        match self.rooms.leave(room, session_id) {
            Departure::Left => {
                out.broadcast(&self.rooms, room, Reply::Left { nick: nickname.to_owned() }, None);
            },
            Departure::Closed => out.log(LogLevel::Debug, format!("room {room} closed")),
            Departure::NotMember => out.log(
                LogLevel::Error,
                format!("session {session_id} left room {room} without being a member"),
            ),
        }
    }

    /// Tear a session down: leave its room, free its nickname, forget it,
    /// and close the connection. `farewell` is sent before the close.
    ///
    /// Runs at most once per session; later calls find nothing to do.
    fn disconnect(
        &mut self,
        session_id: SessionId,
        reason: &str,
        farewell: Option<Reply>,
        out: &mut Outbox,
    ) {
        let Some(session) = self.sessions.remove(&session_id) else {
            return;
        };

        match session.state() {
            SessionState::Init => {},
            SessionState::Outside { nickname } => {
                self.nicknames.remove(nickname);
            },
            SessionState::Inside { nickname, room } => {
                self.leave_room(session_id, nickname, room, out);
                self.nicknames.remove(nickname);
            },
        }

        if let Some(reply) = farewell {
            out.send(session_id, reply);
        }
        out.log(LogLevel::Info, format!("session {session_id} closed: {reason}"));
        out.close(session_id, reason);
    }

    fn set_state(&mut self, session_id: SessionId, state: SessionState) {
        if let Some(session) = self.sessions.get_mut(&session_id) {
            session.set_state(state);
        }
    }
}
