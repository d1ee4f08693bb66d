use std::fmt;

/// Represents a location in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Byte offset from start of file
    pub offset: usize,
}

impl Location {
    /// Create a new location
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A range of source bytes. Both ends are inclusive: `end` is the offset of
/// the last byte that belongs to the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Span of a lexeme of `len` bytes starting at `start`
    pub fn of_len(start: usize, len: usize) -> Self {
        Self { start, end: start + len.max(1) - 1 }
    }

    /// Single byte span
    pub fn at(offset: usize) -> Self {
        Self { start: offset, end: offset }
    }

    /// Length of the span in bytes
    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    /// Extend the span to include another span
    pub fn extend(&mut self, other: Span) {
        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);
    }

    /// Smallest span covering both
    pub fn to(self, other: Span) -> Span {
        let mut span = self;
        span.extend(other);
        span
    }

    /// Check if an offset is within this span
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset <= self.end
    }

    /// Get the source text for this span
    pub fn source_text<'a>(&self, source: &'a str) -> &'a str {
        if self.start >= source.len() {
            return "";
        }
        let end = (self.end + 1).min(source.len());
        source.get(self.start..end).unwrap_or("")
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Trait for types that carry a source span
pub trait HasSpan {
    /// Get the span of this item
    fn span(&self) -> Span;
}

impl HasSpan for Span {
    fn span(&self) -> Span {
        *self
    }
}

/// Maps byte offsets back to 1-based lines and columns.
#[derive(Debug, Clone)]
pub struct LineMap {
    line_starts: Vec<usize>,
}

impl LineMap {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self { line_starts }
    }

    pub fn location(&self, offset: usize) -> Location {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        Location::new(line + 1, offset - self.line_starts[line] + 1, offset)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inclusive_span() {
        let span = Span::of_len(4, 3);
        assert_eq!(span, Span::new(4, 6));
        assert_eq!(span.len(), 3);
        assert_eq!(span.source_text("abcdefghij"), "efg");
        assert!(span.contains(6));
        assert!(!span.contains(7));
    }

    #[test]
    fn test_line_map() {
        let map = LineMap::new("ab\ncd\n\nx");
        assert_eq!(map.location(0), Location::new(1, 1, 0));
        assert_eq!(map.location(3), Location::new(2, 1, 3));
        assert_eq!(map.location(4), Location::new(2, 2, 4));
        assert_eq!(map.location(7), Location::new(4, 1, 7));
        assert_eq!(map.line_count(), 4);
    }
}
