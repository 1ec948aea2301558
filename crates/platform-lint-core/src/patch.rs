//! Text edits and fixes.
//!
//! A [`Fix`] is a titled set of [`TextEdit`]s against the original text of
//! one file. Offsets always refer to the original text; applying a fix never
//! shifts the offsets of later edits in the same fix.

use crate::model::Range;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Spaces per indentation level used in synthesized code for space-indented sources.
pub const INDENT_WIDTH: usize = 4;

/// Errors raised while validating or applying a fix.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    /// Two edits of the same fix overlap.
    #[error("edits overlap: [{first_start}, {first_end}) and [{second_start}, {second_end})")]
    Overlap {
        /// Start of the earlier edit.
        first_start: usize,
        /// End of the earlier edit.
        first_end: usize,
        /// Start of the later edit.
        second_start: usize,
        /// End of the later edit.
        second_end: usize,
    },

    /// An edit has its end before its start.
    #[error("edit [{start}, {end}) is inverted")]
    Inverted {
        /// Edit start.
        start: usize,
        /// Edit end.
        end: usize,
    },

    /// An edit reaches past the end of the text.
    #[error("edit end {offset} is past the end of the text ({len} bytes)")]
    OutOfBounds {
        /// Offending offset.
        offset: usize,
        /// Text length.
        len: usize,
    },

    /// An edit boundary splits a UTF-8 character.
    #[error("offset {offset} is not on a character boundary")]
    NotCharBoundary {
        /// Offending offset.
        offset: usize,
    },
}

/// Replaces the bytes `[start, end)` of the original text.
///
/// An insertion has `start == end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    /// Start offset in the original text.
    pub start: usize,
    /// End offset in the original text.
    pub end: usize,
    /// Replacement text.
    pub replacement: String,
}

impl TextEdit {
    /// Inserts `text` at `offset`.
    #[must_use]
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            start: offset,
            end: offset,
            replacement: text.into(),
        }
    }

    /// Replaces the text covered by `range`.
    #[must_use]
    pub fn replace(range: Range, text: impl Into<String>) -> Self {
        Self {
            start: range.start.offset,
            end: range.end.offset,
            replacement: text.into(),
        }
    }

    /// Returns true if the edit removes nothing.
    #[must_use]
    pub fn is_insertion(&self) -> bool {
        self.start == self.end
    }
}

/// A titled, atomic set of edits that resolves one violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    /// Short imperative title (e.g. "Insert a `NetworkTraceOp` tag").
    pub title: String,
    /// Edits against the original text.
    pub edits: Vec<TextEdit>,
}

impl Fix {
    /// Creates a fix with no edits.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            edits: Vec::new(),
        }
    }

    /// Creates a fix made of one insertion.
    #[must_use]
    pub fn insertion(title: impl Into<String>, offset: usize, text: impl Into<String>) -> Self {
        Self::new(title).with_edit(TextEdit::insert(offset, text))
    }

    /// Creates a fix made of one replacement.
    #[must_use]
    pub fn replacement(title: impl Into<String>, range: Range, text: impl Into<String>) -> Self {
        Self::new(title).with_edit(TextEdit::replace(range, text))
    }

    /// Adds an edit.
    #[must_use]
    pub fn with_edit(mut self, edit: TextEdit) -> Self {
        self.edits.push(edit);
        self
    }

    /// Edits ordered by position; edits at the same offset keep their insertion order.
    fn sorted_edits(&self) -> Vec<&TextEdit> {
        let mut edits: Vec<&TextEdit> = self.edits.iter().collect();
        edits.sort_by_key(|e| (e.start, e.end));
        edits
    }

    /// Checks that no edit is inverted and no two edits overlap.
    ///
    /// # Errors
    ///
    /// Returns the first inverted or overlapping edit found.
    pub fn validate(&self) -> Result<(), PatchError> {
        let mut previous: Option<&TextEdit> = None;
        for edit in self.sorted_edits() {
            if edit.end < edit.start {
                return Err(PatchError::Inverted {
                    start: edit.start,
                    end: edit.end,
                });
            }
            if let Some(prev) = previous {
                if edit.start < prev.end {
                    return Err(PatchError::Overlap {
                        first_start: prev.start,
                        first_end: prev.end,
                        second_start: edit.start,
                        second_end: edit.end,
                    });
                }
            }
            previous = Some(edit);
        }
        Ok(())
    }

    /// Applies the fix to `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the fix is invalid or does not fit `source`.
    pub fn apply(&self, source: &str) -> Result<String, PatchError> {
        self.validate()?;

        let mut output = String::with_capacity(source.len());
        let mut cursor = 0;
        for edit in self.sorted_edits() {
            if edit.end > source.len() {
                return Err(PatchError::OutOfBounds {
                    offset: edit.end,
                    len: source.len(),
                });
            }
            for offset in [edit.start, edit.end] {
                if !source.is_char_boundary(offset) {
                    return Err(PatchError::NotCharBoundary { offset });
                }
            }
            output.push_str(&source[cursor..edit.start]);
            output.push_str(&edit.replacement);
            cursor = edit.end;
        }
        output.push_str(&source[cursor..]);
        Ok(output)
    }
}

// ────────────────────────────────────────────
// Formatting inference
// ────────────────────────────────────────────

/// Returns true if the given item start lines span more than one line.
#[must_use]
pub fn spans_lines<I>(lines: I) -> bool
where
    I: IntoIterator<Item = usize>,
{
    let mut lines = lines.into_iter();
    match lines.next() {
        Some(first) => lines.any(|line| line != first),
        None => false,
    }
}

/// One indentation level nested inside `outer`.
///
/// A tab when `outer` is tab-indented, [`INDENT_WIDTH`] spaces otherwise.
#[must_use]
pub fn indent_step(outer: &str) -> String {
    if outer.contains('\t') {
        "\t".to_string()
    } else {
        " ".repeat(INDENT_WIDTH)
    }
}

/// Layout of an existing comma-separated list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListShape {
    /// Whether the list already has items.
    pub has_items: bool,
    /// Whether items are laid out one per line.
    pub multiline: bool,
    /// Leading whitespace of the lines items start on.
    pub indent: String,
}

/// Text to insert for a new trailing `item` in a list of the given shape.
///
/// With items the text goes right after the last item; without items it goes
/// right after the opening delimiter.
#[must_use]
pub fn list_item_insertion(shape: &ListShape, item: &str) -> String {
    let indent = &shape.indent;
    match (shape.has_items, shape.multiline) {
        (true, true) => format!(",\n{indent}{item}"),
        (true, false) => format!(", {item}"),
        (false, true) => format!("\n{indent}{item}"),
        (false, false) => item.to_string(),
    }
}

/// Text of an `init` block holding `statement`, for a declaration indented by `outer`.
///
/// With `open_body` the declaration has no body yet and the text opens and
/// closes one; it is meant to follow the supertype list. Otherwise the text
/// is meant to follow the existing body's opening brace.
#[must_use]
pub fn init_block(statement: &str, outer: &str, open_body: bool) -> String {
    let step = indent_step(outer);
    let inner = format!("{outer}{step}");
    let innermost = format!("{inner}{step}");

    let mut text = String::new();
    if open_body {
        text.push_str(" {");
    }
    text.push_str(&format!("\n{inner}init {{\n{innermost}{statement}\n{inner}}}\n"));
    if open_body {
        text.push_str(outer);
        text.push('}');
    }
    text
}
