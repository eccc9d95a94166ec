//! Client command parsing.
//!
//! A line starting with `/` is a command. It is split on runs of ASCII
//! whitespace (see [`is_separator`]) into at most three tokens: the keyword,
//! the first argument, and the rest of the line as a single argument. Lines
//! that start with `/` but name no known keyword are not errors; the server
//! decides what they mean from the session state.

use std::fmt;

use thiserror::Error;

use crate::text::{is_separator, trim_line};

/// Keyword of a command the server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    /// `/nick <name>`
    Nick,
    /// `/join <room>`
    Join,
    /// `/leave`
    Leave,
    /// `/priv <nick> <text>`
    Priv,
    /// `/bye`
    Bye,
}

impl CommandName {
    /// Match a keyword token, including its leading slash.
    ///
    /// Keywords are case-sensitive.
    pub fn from_keyword(token: &str) -> Option<Self> {
        match token {
            "/nick" => Some(Self::Nick),
            "/join" => Some(Self::Join),
            "/leave" => Some(Self::Leave),
            "/priv" => Some(Self::Priv),
            "/bye" => Some(Self::Bye),
            _ => None,
        }
    }

    /// Keyword as written on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nick => "/nick",
            Self::Join => "/join",
            Self::Leave => "/leave",
            Self::Priv => "/priv",
            Self::Bye => "/bye",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A known command was sent without its required arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{command} is missing a required argument")]
pub struct MissingArgument {
    /// Command that was malformed
    pub command: CommandName,
}

/// A parsed client line.
///
/// Borrows from the line it was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Claim or change a nickname.
    Nick {
        /// Requested nickname
        name: &'a str,
    },

    /// Join a room, leaving the current one first.
    Join {
        /// Room to join
        room: &'a str,
    },

    /// Leave the current room.
    Leave,

    /// Send text to a single user.
    Priv {
        /// Nickname of the recipient
        target: &'a str,
        /// Rest of the line, internal whitespace preserved
        text: &'a str,
    },

    /// Disconnect.
    Bye,

    /// Plain text (does not start with `/`).
    Message {
        /// The whole line
        text: &'a str,
    },

    /// A `/` line whose keyword is not a known command.
    Unrecognized {
        /// The whole line, slash included
        line: &'a str,
    },
}

impl<'a> Command<'a> {
    /// Parse one framed line.
    ///
    /// Extra arguments to `/nick`, `/join`, `/leave` and `/bye` are ignored.
    ///
    /// # Errors
    ///
    /// - [`MissingArgument`] if `/nick` or `/join` has no argument, or `/priv`
    ///   lacks either the target or the text.
    pub fn parse(line: &'a str) -> Result<Self, MissingArgument> {
        let line = trim_line(line);
        if !line.starts_with('/') {
            return Ok(Self::Message { text: line });
        }

        let (keyword, rest) = split_token(line);
        let Some(command) = CommandName::from_keyword(keyword) else {
            return Ok(Self::Unrecognized { line });
        };

        let (first, remainder) = split_token(rest);
        let first = non_empty(first);
        let remainder = non_empty(remainder);
        let missing = MissingArgument { command };

        match command {
            CommandName::Nick => first.map(|name| Self::Nick { name }).ok_or(missing),
            CommandName::Join => first.map(|room| Self::Join { room }).ok_or(missing),
            CommandName::Leave => Ok(Self::Leave),
            CommandName::Bye => Ok(Self::Bye),
            CommandName::Priv => match (first, remainder) {
                (Some(target), Some(text)) => Ok(Self::Priv { target, text }),
                _ => Err(missing),
            },
        }
    }
}

/// Split off the first separator-delimited token.
///
/// Returns the token and the rest with leading separators removed.
fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start_matches(is_separator);
    match s.find(is_separator) {
        Some(i) => (&s[..i], s[i..].trim_start_matches(is_separator)),
        None => (s, ""),
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(Command::parse("/nick alice"), Ok(Command::Nick { name: "alice" }));
        assert_eq!(Command::parse("/join   lobby"), Ok(Command::Join { room: "lobby" }));
        assert_eq!(Command::parse("/leave"), Ok(Command::Leave));
        assert_eq!(Command::parse("/bye"), Ok(Command::Bye));
    }

    #[test]
    fn priv_keeps_remainder_as_one_argument() {
        assert_eq!(
            Command::parse("/priv bob  see   you soon"),
            Ok(Command::Priv { target: "bob", text: "see   you soon" })
        );
    }

    #[test]
    fn extra_arguments_are_ignored() {
        assert_eq!(Command::parse("/nick alice smith"), Ok(Command::Nick { name: "alice" }));
        assert_eq!(Command::parse("/leave now"), Ok(Command::Leave));
        assert_eq!(Command::parse("/bye all"), Ok(Command::Bye));
    }

    fn missing(command: CommandName) -> Result<Command<'static>, MissingArgument> {
        Err(MissingArgument { command })
    }

    #[test]
    fn missing_arguments() {
        assert_eq!(Command::parse("/nick"), missing(CommandName::Nick));
        assert_eq!(Command::parse("/join "), missing(CommandName::Join));
        assert_eq!(Command::parse("/priv"), missing(CommandName::Priv));
        assert_eq!(Command::parse("/priv bob"), missing(CommandName::Priv));
    }

    #[test]
    fn plain_and_unrecognized_lines() {
        assert_eq!(Command::parse("hello world"), Ok(Command::Message { text: "hello world" }));
        assert_eq!(Command::parse("/shrug ok"), Ok(Command::Unrecognized { line: "/shrug ok" }));
        assert_eq!(Command::parse("//nick x"), Ok(Command::Unrecognized { line: "//nick x" }));
        assert_eq!(Command::parse("/NICK bob"), Ok(Command::Unrecognized { line: "/NICK bob" }));
    }

    #[test]
    fn only_ascii_whitespace_separates() {
        assert_eq!(
            Command::parse("/nick\u{a0}bob"),
            Ok(Command::Unrecognized { line: "/nick\u{a0}bob" })
        );
        assert_eq!(Command::parse("/nick bo\u{2003}b"), Ok(Command::Nick { name: "bo\u{2003}b" }));
        assert_eq!(Command::parse("/join\tlobby\x0B"), Ok(Command::Join { room: "lobby" }));
        assert_eq!(
            Command::parse("/priv\x0Cbob \u{a0}hi"),
            Ok(Command::Priv { target: "bob", text: "\u{a0}hi" })
        );
    }
}
