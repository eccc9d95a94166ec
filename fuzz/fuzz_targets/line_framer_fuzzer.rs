//! Fuzz target for LineFramer
//!
//! Prevent memory exhaustion and chunking bugs in line reassembly
//!
//! # Strategy
//!
//! - One stream of arbitrary bytes, cut at arbitrary points
//! - Small maximum line lengths so the limit is actually reached
//!
//! # Invariants
//!
//! - Lines produced never depend on how the stream was chunked
//! - Lines are trimmed, non-empty and contain no newline
//! - Buffered input never exceeds the maximum line length
//! - After an error the framer yields nothing more

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sala_proto::{LineFramer, trim_line};

#[derive(Debug, Arbitrary)]
struct FramerInput {
    max_line_length: u8,
    stream: Vec<u8>,
    cuts: Vec<u8>,
}

/// Feed `chunks` and collect every line, stopping at the first error.
fn drain<'a>(max: usize, chunks: impl Iterator<Item = &'a [u8]>) -> (Vec<String>, bool) {
    let mut framer = LineFramer::with_max_line_length(max);
    let mut lines = Vec::new();

    for chunk in chunks {
        framer.extend(chunk);
        while let Some(line) = framer.next_line() {
            match line {
                Ok(line) => lines.push(line),
                Err(_) => {
                    assert!(framer.is_poisoned());
                    assert!(framer.next_line().is_none(), "framer yielded after error");
                    return (lines, true);
                },
            }
        }
        assert!(framer.pending() <= max, "buffered {} > {}", framer.pending(), max);
    }
    (lines, false)
}

fuzz_target!(|input: FramerInput| {
    let max = usize::from(input.max_line_length).max(1);

    let (whole, whole_failed) = drain(max, std::iter::once(input.stream.as_slice()));

    let mut chunks = Vec::new();
    let mut rest = input.stream.as_slice();
    for cut in input.cuts {
        let at = usize::from(cut).min(rest.len());
        let (head, tail) = rest.split_at(at);
        chunks.push(head);
        rest = tail;
    }
    chunks.push(rest);
    let (pieces, pieces_failed) = drain(max, chunks.into_iter());

    for line in &whole {
        assert!(!line.is_empty());
        assert_eq!(trim_line(line), line);
        assert!(!line.contains('\n'));
    }

    // An overlong line may be detected earlier when it arrives in one piece
    if !whole_failed && !pieces_failed {
        assert_eq!(whole, pieces);
    }
});
