//! Server-to-client lines.
//!
//! Every line the server writes is one of the [`Reply`] variants. The
//! [`Display`](fmt::Display) impl produces the line without its terminator;
//! [`Reply::to_line`] adds the `\n` and yields a buffer ready for the socket.
//! Parsing ([`str::parse`]) is the inverse and is what clients use.

use std::{fmt, str::FromStr};

use bytes::Bytes;

use crate::errors::ProtocolError;

/// A line sent by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Command succeeded.
    Ok,

    /// Command failed; state unchanged.
    Error {
        /// Human-readable reason
        reason: String,
    },

    /// Room message from another member.
    Message {
        /// Sender's nickname
        from: String,
        /// Message text, escape already applied
        text: String,
    },

    /// A room member changed nickname.
    NewNick {
        /// Previous nickname
        old: String,
        /// New nickname
        new: String,
    },

    /// Someone joined the room.
    Joined {
        /// Nickname of the joiner
        nick: String,
    },

    /// Someone left the room.
    Left {
        /// Nickname of the leaver
        nick: String,
    },

    /// Private message.
    Private {
        /// Sender's nickname
        from: String,
        /// Message text
        text: String,
    },

    /// Acknowledges `/bye`; the connection closes after this line.
    Bye,
}

impl Reply {
    /// Build an `ERROR` reply.
    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error { reason: reason.into() }
    }

    /// Encode as a newline-terminated wire line.
    pub fn to_line(&self) -> Bytes {
        let mut line = self.to_string();
        line.push('\n');
        Bytes::from(line)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::Error { reason } => write!(f, "ERROR {reason}"),
            Self::Message { from, text } => write!(f, "MESSAGE {from} {text}"),
            Self::NewNick { old, new } => write!(f, "NEWNICK {old} {new}"),
            Self::Joined { nick } => write!(f, "JOINED {nick}"),
            Self::Left { nick } => write!(f, "LEFT {nick}"),
            Self::Private { from, text } => write!(f, "PRIVATE {from} {text}"),
            Self::Bye => f.write_str("BYE"),
        }
    }
}

impl FromStr for Reply {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']);
        let unknown = || ProtocolError::UnknownReply(line.to_owned());

        let (keyword, rest) = match line.split_once(' ') {
            Some((keyword, rest)) => (keyword, Some(rest)),
            None => (line, None),
        };
        let pair = |rest: Option<&str>| {
            rest.and_then(|r| r.split_once(' '))
                .filter(|(first, _)| !first.is_empty())
                .map(|(first, second)| (first.to_owned(), second.to_owned()))
        };
        let single = |rest: Option<&str>| {
            rest.filter(|r| !r.is_empty() && !r.contains(' ')).map(str::to_owned)
        };

        let reply = match keyword {
            "OK" if rest.is_none() => Some(Self::Ok),
            "BYE" if rest.is_none() => Some(Self::Bye),
            "ERROR" => rest.map(|reason| Self::Error { reason: reason.to_owned() }),
            "MESSAGE" => pair(rest).map(|(from, text)| Self::Message { from, text }),
            "PRIVATE" => pair(rest).map(|(from, text)| Self::Private { from, text }),
            "NEWNICK" => pair(rest)
                .filter(|(_, new)| !new.is_empty() && !new.contains(' '))
                .map(|(old, new)| Self::NewNick { old, new }),
            "JOINED" => single(rest).map(|nick| Self::Joined { nick }),
            "LEFT" => single(rest).map(|nick| Self::Left { nick }),
            _ => None,
        };

        reply.ok_or_else(unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_wire_lines() {
        assert_eq!(Reply::Ok.to_string(), "OK");
        assert_eq!(Reply::error("Nome já em uso").to_string(), "ERROR Nome já em uso");
        assert_eq!(
            Reply::Message { from: "alice".into(), text: "hi there".into() }.to_string(),
            "MESSAGE alice hi there"
        );
        assert_eq!(
            Reply::NewNick { old: "a".into(), new: "b".into() }.to_string(),
            "NEWNICK a b"
        );
        assert_eq!(Reply::Bye.to_line(), Bytes::from_static(b"BYE\n"));
    }

    #[test]
    fn parses_wire_lines() {
        assert_eq!("OK".parse::<Reply>(), Ok(Reply::Ok));
        assert_eq!("BYE\n".parse::<Reply>(), Ok(Reply::Bye));
        assert_eq!(
            "PRIVATE alice see you".parse::<Reply>(),
            Ok(Reply::Private { from: "alice".into(), text: "see you".into() })
        );
        assert_eq!("JOINED bob".parse::<Reply>(), Ok(Reply::Joined { nick: "bob".into() }));
        assert_eq!(
            "ERROR Utilizador não encontrado".parse::<Reply>(),
            Ok(Reply::error("Utilizador não encontrado"))
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in ["", "OK extra", "MESSAGE alice", "JOINED", "LEFT a b", "HELLO"] {
            assert_eq!(
                line.parse::<Reply>(),
                Err(ProtocolError::UnknownReply(line.to_owned())),
                "{line:?}"
            );
        }
    }
}
