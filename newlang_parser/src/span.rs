//! Source location tracking.
//!
//! Every token and every `Term` carries a [`Span`] so that parse and
//! runtime errors can point back at the offending source text.

use serde::{Deserialize, Serialize};

/// A region of source code, in bytes, with resolved line/column info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset start (0-indexed)
    pub start: usize,
    /// Byte offset end (exclusive)
    pub end: usize,
    /// Line of `start` (1-indexed)
    pub line: usize,
    /// Column of `start` (1-indexed, bytes)
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// An empty span at the start of the buffer.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Cover both spans; keeps the line/column of the earlier one.
    pub fn merge(&self, other: &Span) -> Span {
        let (line, column) = if self.start <= other.start {
            (self.line, self.column)
        } else {
            (other.line, other.column)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
            column,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Maps byte offsets to line/column pairs.
///
/// Built once per source buffer; lookups binary-search the line starts.
#[derive(Debug, Clone)]
pub struct SourceMap {
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// 1-indexed line and column for a byte offset.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        (line + 1, offset - line_start + 1)
    }

    /// Build a span for `start..end`.
    pub fn span(&self, start: usize, end: usize) -> Span {
        let (line, column) = self.line_col(start);
        Span {
            start,
            end,
            line,
            column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_lookup() {
        let map = SourceMap::new("ab\ncde\n");
        assert_eq!(map.line_col(0), (1, 1));
        assert_eq!(map.line_col(2), (1, 3));
        assert_eq!(map.line_col(3), (2, 1));
        assert_eq!(map.line_col(6), (2, 4));
    }

    #[test]
    fn merge_keeps_earlier_position() {
        let a = Span::new(4, 9, 1, 5);
        let b = Span::new(12, 20, 2, 3);
        let merged = a.merge(&b);
        assert_eq!(merged.start, 4);
        assert_eq!(merged.end, 20);
        assert_eq!((merged.line, merged.column), (1, 5));
    }
}
