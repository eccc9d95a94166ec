//! Whitespace rules shared by framing, parsing and nickname checks.
//!
//! Both rules are ASCII only. A non-breaking space or any other Unicode
//! space is ordinary text: it never separates tokens and is never trimmed.

/// Whether `c` separates command tokens: space, `\t`, `\n`, vertical tab,
/// form feed or `\r`.
pub fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

/// Strip leading and trailing spaces and ASCII control characters
/// (everything up to U+0020).
pub fn trim_line(line: &str) -> &str {
    line.trim_matches(|c: char| c <= ' ')
}
