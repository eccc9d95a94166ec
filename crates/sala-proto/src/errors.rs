//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while framing input or parsing server lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A complete line was not valid UTF-8.
    #[error("line is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 {
        /// Length of the longest valid UTF-8 prefix
        valid_up_to: usize,
    },

    /// A line, or the unterminated tail, grew past the configured bound.
    #[error("line of {len} bytes exceeds limit of {max} bytes")]
    LineTooLong {
        /// Bytes buffered for the offending line
        len: usize,
        /// Configured maximum
        max: usize,
    },

    /// A server line did not match any known reply.
    #[error("unrecognized reply line: {0:?}")]
    UnknownReply(String),
}

impl ProtocolError {
    /// Whether the connection that produced this error must be closed.
    ///
    /// Framing errors leave the byte stream in an unknown position, so there
    /// is no way to resynchronise on the next line.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidUtf8 { .. } | Self::LineTooLong { .. })
    }
}
