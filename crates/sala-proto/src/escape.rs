//! Leading-slash escape rule.

use std::borrow::Cow;

/// Strip the escape slash from text a client sent.
///
/// Text beginning with `//` loses exactly one leading `/`. Anything else is
/// returned unchanged, so the rule is applied once and only once.
pub fn unescape_incoming(text: &str) -> &str {
    match text.strip_prefix('/') {
        Some(rest) if rest.starts_with('/') => rest,
        _ => text,
    }
}

/// Escape literal text before a client sends it.
///
/// Inverse of [`unescape_incoming`]: text beginning with `/` gets a second
/// slash so the server does not treat it as a command.
pub fn escape_outgoing(text: &str) -> Cow<'_, str> {
    if text.starts_with('/') { Cow::Owned(format!("/{text}")) } else { Cow::Borrowed(text) }
}
