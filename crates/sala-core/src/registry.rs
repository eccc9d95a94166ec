//! Nickname registry.
//!
//! Maps each bound nickname to the session holding it. This is the only
//! place nickname uniqueness is enforced: a session's state records its
//! nickname, but the driver changes that state only after the registry has
//! accepted the name.

use std::collections::HashMap;

use sala_proto::is_separator;

use crate::{SessionId, error::CommandError};

/// Registry of bound nicknames.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// Nickname → session holding it
    by_nickname: HashMap<String, SessionId>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `nickname` is well formed: non-empty, no ASCII whitespace.
    pub fn is_valid_nickname(nickname: &str) -> bool {
        !nickname.is_empty() && !nickname.contains(is_separator)
    }

    /// Whether `nickname` is well formed and not bound to any session.
    pub fn is_available(&self, nickname: &str) -> bool {
        Self::is_valid_nickname(nickname) && !self.by_nickname.contains_key(nickname)
    }

    /// Bind `nickname` to `session`.
    ///
    /// # Errors
    ///
    /// - [`CommandError::NameConflict`] if the name is bound (to anyone,
    ///   including `session`) or malformed.
    pub fn register(&mut self, nickname: &str, session: SessionId) -> Result<(), CommandError> {
        if !self.is_available(nickname) {
            return Err(CommandError::NameConflict);
        }
        self.by_nickname.insert(nickname.to_owned(), session);
        Ok(())
    }

    /// Move `session` from `old` to `new` in one step.
    ///
    /// Validation happens before anything changes, so a failed rename leaves
    /// `old` bound.
    ///
    /// # Errors
    ///
    /// - [`CommandError::NameConflict`] under the same rules as
    ///   [`register`](Self::register). Renaming to one's own current name is
    ///   a conflict.
    pub fn rename(&mut self, old: &str, new: &str, session: SessionId) -> Result<(), CommandError> {
        self.register(new, session)?;
        if self.by_nickname.get(old) == Some(&session) {
            self.by_nickname.remove(old);
        }
        Ok(())
    }

    /// Session holding `nickname`.
    pub fn lookup(&self, nickname: &str) -> Option<SessionId> {
        self.by_nickname.get(nickname).copied()
    }

    /// Unbind `nickname`, returning the session that held it.
    pub fn remove(&mut self, nickname: &str) -> Option<SessionId> {
        self.by_nickname.remove(nickname)
    }

    /// All bindings, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, SessionId)> {
        self.by_nickname.iter().map(|(nick, id)| (nick.as_str(), *id))
    }

    /// Number of bound nicknames.
    pub fn len(&self) -> usize {
        self.by_nickname.len()
    }

    /// Whether no nickname is bound.
    pub fn is_empty(&self) -> bool {
        self.by_nickname.is_empty()
    }
}
