//! Sala wire protocol.
//!
//! Clients and the server exchange newline-terminated UTF-8 lines over a
//! stream transport. This crate owns the text format and nothing else: it
//! performs no I/O and keeps no session state.
//!
//! # Components
//!
//! - [`LineFramer`]: reassembles complete lines from arbitrary byte chunks
//! - [`Command`]: a parsed client line (`/nick`, `/join`, plain text, ...)
//! - [`Reply`]: a server line (`OK`, `MESSAGE alice hi`, ...)
//! - [`unescape_incoming`] / [`escape_outgoing`]: the leading-slash escape
//! - [`trim_line`] / [`is_separator`]: the ASCII whitespace rules
//!
//! # Escape rule
//!
//! A line starting with `/` is a command. To send literal text that starts
//! with `/`, a client doubles the slash; the server strips exactly one
//! leading `/` from text that starts with `//` before relaying it.

mod command;
mod errors;
mod escape;
mod framer;
mod reply;
mod text;

pub use command::{Command, CommandName, MissingArgument};
pub use errors::{ProtocolError, Result};
pub use escape::{escape_outgoing, unescape_incoming};
pub use framer::{DEFAULT_MAX_LINE_LENGTH, LineFramer, Lines};
pub use reply::Reply;
pub use text::{is_separator, trim_line};
