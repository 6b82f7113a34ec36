/// Position tracking for model nodes
///
/// Stores the source location (line/column) of artifacts, references and
/// extension statements for diagnostics.
use std::fmt;

use super::SourceId;

/// A span representing a range in source code (1-indexed lines and columns)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// A position in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// A span in a particular source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Location {
    pub source: SourceId,
    pub span: Span,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl Location {
    pub fn new(source: SourceId, span: Span) -> Self {
        Self { source, span }
    }

    /// A zero-width location at `line:column`.
    pub fn at(source: SourceId, line: u32, column: u32) -> Self {
        let pos = Position::new(line, column);
        Self {
            source,
            span: Span::new(pos, pos),
        }
    }

    pub fn line(&self) -> u32 {
        self.span.start.line
    }

    pub fn column(&self) -> u32 {
        self.span.start.column
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.source,
            self.span.start.line,
            self.span.start.column
        )
    }
}
