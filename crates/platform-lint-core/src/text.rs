//! Offset to line/column conversion for source text.
//!
//! Hosts use [`SourceText`] to attach [`Range`]s to the nodes they build;
//! fix tests use it to locate snippets in fixture sources.

use crate::model::{Position, Range};

/// Precomputed line start offsets of a file.
///
/// Built once per file in O(n); each lookup is a binary search.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// `line_starts[0] = 0` (line 1), `line_starts[1]` = first newline + 1, ...
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    /// Builds the index for `content`.
    #[must_use]
    pub fn new(content: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, ch) in content.char_indices() {
            if ch == '\n' {
                line_starts.push(offset + 1);
            }
        }
        Self {
            line_starts,
            len: content.len(),
        }
    }

    /// Number of lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Converts a byte offset to a 1-indexed position. Offsets past the end are clamped.
    #[must_use]
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line_idx).copied().unwrap_or(0);
        Position::new(line_idx + 1, offset - line_start + 1, offset)
    }

    /// Converts a byte span to a range.
    #[must_use]
    pub fn range(&self, start: usize, end: usize) -> Range {
        Range::new(self.position(start), self.position(end))
    }

    /// Calculates the byte offset of a 1-indexed line and column.
    ///
    /// Returns the end of the text when the line is out of bounds.
    #[must_use]
    pub fn offset_for(&self, line: usize, column: usize) -> usize {
        if line == 0 {
            return 0;
        }
        match self.line_starts.get(line - 1) {
            Some(start) => (start + column.saturating_sub(1)).min(self.len),
            None => self.len,
        }
    }
}

/// Source text paired with its line index.
#[derive(Debug, Clone)]
pub struct SourceText<'a> {
    content: &'a str,
    index: LineIndex,
}

impl<'a> SourceText<'a> {
    /// Indexes `content`.
    #[must_use]
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            index: LineIndex::new(content),
        }
    }

    /// The underlying text.
    #[must_use]
    pub fn content(&self) -> &'a str {
        self.content
    }

    /// The line index.
    #[must_use]
    pub fn index(&self) -> &LineIndex {
        &self.index
    }

    /// Range of the first occurrence of `needle`.
    #[must_use]
    pub fn find(&self, needle: &str) -> Option<Range> {
        self.find_nth(needle, 0)
    }

    /// Range of the `n`-th (0-indexed) occurrence of `needle`.
    #[must_use]
    pub fn find_nth(&self, needle: &str, n: usize) -> Option<Range> {
        let (start, _) = self.content.match_indices(needle).nth(n)?;
        Some(self.index.range(start, start + needle.len()))
    }

    /// Range from the first occurrence of `open` to the end of the next `close` after it.
    #[must_use]
    pub fn span(&self, open: &str, close: &str) -> Option<Range> {
        let start = self.content.find(open)?;
        let rest = self.content.get(start + open.len()..)?;
        let end = start + open.len() + rest.find(close)? + close.len();
        Some(self.index.range(start, end))
    }

    /// Range of the byte span `[start, end)`.
    #[must_use]
    pub fn range(&self, start: usize, end: usize) -> Range {
        self.index.range(start, end)
    }
}
