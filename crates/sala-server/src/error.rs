//! Server error types.

use std::fmt;

/// Errors that can stop the server.
///
/// Per-connection failures never surface here; they tear down only the
/// connection involved.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error (unparsable or unavailable bind address).
    ///
    /// Fatal: prevents startup. Fix configuration and restart.
    Config(String),

    /// Transport error on the listening socket.
    ///
    /// Usually fatal (address in use, listener closed).
    Transport(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
