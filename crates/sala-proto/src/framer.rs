//! Line framing over a byte stream.
//!
//! A stream transport delivers bytes in whatever chunks the network produced,
//! so one read can hold half a line, several lines, or the end of one line
//! and the start of the next. [`LineFramer`] keeps the unterminated tail
//! between reads and hands out complete lines in arrival order.
//!
//! Framing happens on bytes, and each complete line is decoded as UTF-8 on
//! its own. A multi-byte character split across two reads is therefore
//! reassembled before decoding.
//!
//! # Line handling
//!
//! - Lines end at `\n`; leading and trailing spaces and control characters
//!   (including `\r`) are trimmed, see [`trim_line`](crate::trim_line)
//! - Empty lines are skipped
//! - Invalid UTF-8 and over-long lines are fatal: the framer is poisoned and
//!   yields nothing more

use bytes::{Buf, BytesMut};

use crate::{
    errors::{ProtocolError, Result},
    text::trim_line,
};

/// Default bound on one line and on the unterminated tail, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 16 * 1024;

/// Reassembles newline-terminated lines from arbitrary byte chunks.
#[derive(Debug)]
pub struct LineFramer {
    /// Bytes received but not yet consumed as a complete line
    tail: BytesMut,
    /// Prefix of `tail` already known to contain no `\n`
    scanned: usize,
    max_line_length: usize,
    poisoned: bool,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    /// Create a framer with [`DEFAULT_MAX_LINE_LENGTH`].
    pub fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// Create a framer that rejects lines longer than `max_line_length` bytes.
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self { tail: BytesMut::new(), scanned: 0, max_line_length, poisoned: false }
    }

    /// Append newly read bytes to the tail.
    ///
    /// Ignored once the framer is poisoned.
    pub fn extend(&mut self, data: &[u8]) {
        if !self.poisoned {
            self.tail.extend_from_slice(data);
        }
    }

    /// Append bytes and iterate over the lines they complete.
    pub fn push(&mut self, data: &[u8]) -> Lines<'_> {
        self.extend(data);
        self.lines()
    }

    /// Iterate over the complete lines currently buffered.
    pub fn lines(&mut self) -> Lines<'_> {
        Lines { framer: self }
    }

    /// Extract the next complete, non-empty line.
    ///
    /// Returns `None` when no complete line is buffered. After an error the
    /// framer is poisoned and always returns `None`.
    pub fn next_line(&mut self) -> Option<Result<String>> {
        loop {
            if self.poisoned {
                return None;
            }

            let Some(offset) = self.tail[self.scanned..].iter().position(|&b| b == b'\n') else {
                self.scanned = self.tail.len();
                if self.tail.len() > self.max_line_length {
                    let len = self.tail.len();
                    return Some(Err(self.poison(ProtocolError::LineTooLong {
                        len,
                        max: self.max_line_length,
                    })));
                }
                return None;
            };

            let end = self.scanned + offset;
            if end > self.max_line_length {
                return Some(Err(
                    self.poison(ProtocolError::LineTooLong { len: end, max: self.max_line_length })
                ));
            }

            let line = self.tail.split_to(end);
            self.tail.advance(1);
            self.scanned = 0;

            match std::str::from_utf8(&line) {
                Ok(text) => {
                    let trimmed = trim_line(text);
                    if !trimmed.is_empty() {
                        return Some(Ok(trimmed.to_owned()));
                    }
                },
                Err(e) => {
                    return Some(Err(
                        self.poison(ProtocolError::InvalidUtf8 { valid_up_to: e.valid_up_to() })
                    ));
                },
            }
        }
    }

    /// Number of buffered bytes not yet consumed as a line.
    pub fn pending(&self) -> usize {
        self.tail.len()
    }

    /// Whether a fatal error has been produced.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn poison(&mut self, err: ProtocolError) -> ProtocolError {
        self.poisoned = true;
        self.tail.clear();
        self.scanned = 0;
        err
    }
}

/// Iterator over the complete lines buffered in a [`LineFramer`].
///
/// Lines are extracted lazily, one per call to `next`.
#[derive(Debug)]
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Lines<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.framer.next_line()
    }
}
