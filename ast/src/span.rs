//! Source positions.
//!
//! The parser stamps every tree node with the region it covers; the
//! compiler reads positions back out for diagnostics and, when debug
//! markers are on, stamps them into the emitted bytecode.

use std::fmt;

/// A point in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    /// 0-based byte offset into the input.
    pub offset: usize,
    /// 1-based line.
    pub line: usize,
    /// 1-based byte column.
    pub column: usize,
}

impl Pos {
    pub const fn new(offset: usize, line: usize, column: usize) -> Self {
        Self { offset, line, column }
    }

    /// First line, first column.
    pub const fn origin() -> Self {
        Self::new(0, 1, 1)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A region of source text, from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub const fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    /// A zero-width span, for positions rather than regions.
    pub const fn point(at: Pos) -> Self {
        Self::new(at, at)
    }

    /// The smallest span covering both, in either argument order. Widens
    /// a diagnostic over two related names.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: std::cmp::min_by_key(self.start, other.start, |p| p.offset),
            end: std::cmp::max_by_key(self.end, other.end, |p| p.offset),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
