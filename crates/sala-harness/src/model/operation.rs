//! Operations for model-based testing.
//!
//! Operations are generated randomly and applied to both the model and the
//! real driver. Nicknames, rooms and texts come from tiny pools so random
//! sequences collide often: duplicate nicknames, shared rooms, messages to
//! clients that just left.

use arbitrary::Arbitrary;

/// Client identifier (0-indexed).
pub type ClientId = u8;

/// Nickname drawn from a small pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum NickChoice {
    /// `ana`
    Ana,
    /// `rui`
    Rui,
    /// `eva`
    Eva,
}

impl NickChoice {
    /// Wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ana => "ana",
            Self::Rui => "rui",
            Self::Eva => "eva",
        }
    }
}

/// Room drawn from a small pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum RoomChoice {
    /// `lobby`
    Lobby,
    /// `attic`
    Attic,
}

impl RoomChoice {
    /// Wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::Attic => "attic",
        }
    }
}

/// Room line content, covering every escape case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum TextChoice {
    /// Plain text
    Plain,
    /// Text with inner runs of whitespace
    Spaced,
    /// `//` prefix: one slash is stripped
    Escaped,
    /// `///` prefix: still only one slash is stripped
    DoubleEscaped,
    /// Unknown `/command`
    UnknownCommand,
}

impl TextChoice {
    /// Line as the client sends it.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "hello",
            Self::Spaced => "see  you   later",
            Self::Escaped => "//nick is a command",
            Self::DoubleEscaped => "///x",
            Self::UnknownCommand => "/dance",
        }
    }
}

/// Operations that can be applied to the system.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Open a connection (no-op if already connected).
    Connect {
        /// Client connecting
        client_id: ClientId,
    },

    /// Peer closes its end without `/bye`.
    Disconnect {
        /// Client disconnecting
        client_id: ClientId,
    },

    /// `/nick <name>`
    Nick {
        /// Client renaming
        client_id: ClientId,
        /// Requested nickname
        name: NickChoice,
    },

    /// `/nick` without a name.
    NickWithoutName {
        /// Client sending the malformed command
        client_id: ClientId,
    },

    /// `/join <room>`
    Join {
        /// Client joining
        client_id: ClientId,
        /// Room to join
        room: RoomChoice,
    },

    /// `/leave`
    Leave {
        /// Client leaving
        client_id: ClientId,
    },

    /// A room line (plain or slash-prefixed).
    Say {
        /// Client speaking
        client_id: ClientId,
        /// Line content
        text: TextChoice,
    },

    /// `/priv <target> <text>`
    Private {
        /// Sender
        client_id: ClientId,
        /// Recipient nickname
        target: NickChoice,
        /// Message content
        text: TextChoice,
    },

    /// `/bye`
    Bye {
        /// Client leaving
        client_id: ClientId,
    },
}

impl Operation {
    /// Client the operation acts for.
    pub fn client_id(&self) -> ClientId {
        match self {
            Self::Connect { client_id }
            | Self::Disconnect { client_id }
            | Self::Nick { client_id, .. }
            | Self::NickWithoutName { client_id }
            | Self::Join { client_id, .. }
            | Self::Leave { client_id }
            | Self::Say { client_id, .. }
            | Self::Private { client_id, .. }
            | Self::Bye { client_id } => *client_id,
        }
    }

    /// Same operation acting for a different client.
    pub fn with_client_id(mut self, id: ClientId) -> Self {
        match &mut self {
            Self::Connect { client_id }
            | Self::Disconnect { client_id }
            | Self::Nick { client_id, .. }
            | Self::NickWithoutName { client_id }
            | Self::Join { client_id, .. }
            | Self::Leave { client_id }
            | Self::Say { client_id, .. }
            | Self::Private { client_id, .. }
            | Self::Bye { client_id } => *client_id = id,
        }
        self
    }

    /// Wire line the client sends, if the operation sends one.
    ///
    /// `Connect` and `Disconnect` are transport events, not lines.
    pub fn line(&self) -> Option<String> {
        match self {
            Self::Connect { .. } | Self::Disconnect { .. } => None,
            Self::Nick { name, .. } => Some(format!("/nick {}", name.as_str())),
            Self::NickWithoutName { .. } => Some("/nick".to_owned()),
            Self::Join { room, .. } => Some(format!("/join {}", room.as_str())),
            Self::Leave { .. } => Some("/leave".to_owned()),
            Self::Say { text, .. } => Some(text.as_str().to_owned()),
            Self::Private { target, text, .. } => {
                Some(format!("/priv {} {}", target.as_str(), text.as_str()))
            },
            Self::Bye { .. } => Some("/bye".to_owned()),
        }
    }
}
