//! Error types for the chat core.
//!
//! [`CommandError`] is the recoverable kind: the invoker gets
//! `ERROR <reason>` and nothing else changes. [`DriverError`] reports events
//! the driver could not attribute to a live session; the runtime logs and
//! drops them.

use sala_proto::{CommandName, MissingArgument, Reply};
use thiserror::Error;

use crate::SessionId;

/// A command was rejected. Session and registry state are unchanged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Nickname is taken, empty, or contains whitespace
    #[error("nickname unavailable")]
    NameConflict,

    /// Command is not accepted in the session's lifecycle state
    #[error("command not allowed in current state")]
    InvalidState,

    /// Room-only operation attempted outside a room
    #[error("not in a room")]
    NotInRoom,

    /// Unknown `/command` sent outside a room
    #[error("unsupported command")]
    UnsupportedCommand,

    /// `/priv` recipient is not connected
    #[error("target not found")]
    TargetNotFound,

    /// Known command with missing arguments
    #[error("malformed {0} command")]
    MalformedCommand(CommandName),
}

impl CommandError {
    /// Reason text the client sees after `ERROR `.
    pub fn reason(self) -> &'static str {
        match self {
            Self::NameConflict => "Nome já em uso",
            Self::InvalidState => "Comando não permitido neste estado",
            Self::NotInRoom => "Não está numa sala",
            Self::UnsupportedCommand => "Comando não suportado",
            Self::TargetNotFound => "Utilizador não encontrado",
            Self::MalformedCommand(command) => match command {
                CommandName::Nick => "Nome inválido",
                CommandName::Join => "Sala inválida",
                CommandName::Priv => "Uso: /priv nome mensagem",
                // Never produced: these commands take no required arguments
                CommandName::Leave | CommandName::Bye => "Comando inválido",
            },
        }
    }

    /// The `ERROR` line reporting this failure.
    pub fn to_reply(self) -> Reply {
        Reply::error(self.reason())
    }
}

impl From<MissingArgument> for CommandError {
    fn from(err: MissingArgument) -> Self {
        Self::MalformedCommand(err.command)
    }
}

/// Events the driver could not apply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Event names a session that is not connected (or already closed)
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// Runtime reused an identifier that is still live
    #[error("session {0} already exists")]
    DuplicateSession(SessionId),
}
