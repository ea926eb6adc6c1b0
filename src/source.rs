use std::fmt;

use serde::{Deserialize, Serialize};

/// A zero-based line/column position within a source document.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// A half-open range within a named source document.
///
/// `file` is the canonical URL of the document the range points into, which
/// is not necessarily the document a feature was surfaced on: inherited
/// members keep ranges into their defining file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub file: String,
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceRange {
    pub fn new(file: impl Into<String>, start: SourcePosition, end: SourcePosition) -> Self {
        Self {
            file: file.into(),
            start,
            end,
        }
    }

    /// A zero-length range at the top of `file`, used when a failure has no
    /// better position to point at.
    pub fn empty(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            start: SourcePosition::default(),
            end: SourcePosition::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.start)
    }
}

/// Offset of an inline document within its containing markup document.
///
/// Positions on the first line of the inline document shift by `col`; every
/// position shifts down by `line`. `filename` names the containing document
/// so nested ranges map back to the outer file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LocationOffset {
    pub line: usize,
    pub col: usize,
    pub filename: Option<String>,
}

impl LocationOffset {
    pub fn new(line: usize, col: usize, filename: Option<String>) -> Self {
        Self {
            line,
            col,
            filename,
        }
    }

    /// Rebase a position expressed in inline-document coordinates onto the
    /// containing document.
    pub fn correct_position(&self, position: SourcePosition) -> SourcePosition {
        SourcePosition {
            line: position.line + self.line,
            column: if position.line == 0 {
                position.column + self.col
            } else {
                position.column
            },
        }
    }

    pub fn correct_range(&self, range: &SourceRange) -> SourceRange {
        SourceRange {
            file: self
                .filename
                .clone()
                .unwrap_or_else(|| range.file.clone()),
            start: self.correct_position(range.start),
            end: self.correct_position(range.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LocationOffset, SourcePosition, SourceRange};

    #[test]
    fn corrects_first_line_columns_only() {
        let offset = LocationOffset::new(10, 8, Some("outer.html".to_string()));
        assert_eq!(
            offset.correct_position(SourcePosition::new(0, 3)),
            SourcePosition::new(10, 11)
        );
        assert_eq!(
            offset.correct_position(SourcePosition::new(2, 3)),
            SourcePosition::new(12, 3)
        );
    }

    #[test]
    fn corrected_range_takes_container_filename() {
        let offset = LocationOffset::new(4, 0, Some("outer.html".to_string()));
        let range = SourceRange::new(
            "inline",
            SourcePosition::new(1, 0),
            SourcePosition::new(1, 5),
        );
        let corrected = offset.correct_range(&range);
        assert_eq!(corrected.file, "outer.html");
        assert_eq!(corrected.start, SourcePosition::new(5, 0));
    }

    #[test]
    fn empty_range_is_empty() {
        assert!(SourceRange::empty("a.html").is_empty());
    }
}
