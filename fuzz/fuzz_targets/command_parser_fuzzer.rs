//! Fuzz target for Command::parse and the reply codec
//!
//! # Invariants
//!
//! - Parsing any line never panics
//! - Every argument is a non-empty slice of the input that neither starts nor
//!   ends with ASCII whitespace; names and rooms hold none at all
//! - Only lines starting with `/` parse as commands
//! - `escape_outgoing` followed by `unescape_incoming` is the identity
//! - Any parsed reply re-encodes to a line that parses back to itself

#![no_main]

use libfuzzer_sys::fuzz_target;
use sala_proto::{Command, Reply, escape_outgoing, is_separator, trim_line, unescape_incoming};

fn check_argument(line: &str, arg: &str) {
    assert!(!arg.is_empty());
    assert!(!arg.starts_with(is_separator) && !arg.ends_with(is_separator));
    assert!(line.contains(arg));
}

fuzz_target!(|line: &str| {
    match Command::parse(line) {
        Ok(Command::Nick { name }) => {
            check_argument(line, name);
            assert!(!name.contains(is_separator));
        },
        Ok(Command::Join { room }) => {
            check_argument(line, room);
            assert!(!room.contains(is_separator));
        },
        Ok(Command::Priv { target, text }) => {
            check_argument(line, target);
            check_argument(line, text);
        },
        Ok(Command::Message { text }) => assert!(!text.starts_with('/')),
        Ok(Command::Unrecognized { line: rest }) => assert!(rest.starts_with('/')),
        Ok(Command::Leave | Command::Bye) | Err(_) => assert!(trim_line(line).starts_with('/')),
    }

    let escaped = escape_outgoing(line);
    assert_eq!(unescape_incoming(&escaped), line);

    if let Ok(reply) = line.parse::<Reply>() {
        let encoded = reply.to_line();
        let text = std::str::from_utf8(&encoded).expect("reply lines are UTF-8");
        assert_eq!(text.trim_end_matches('\n').parse::<Reply>().ok(), Some(reply));
    }
});
