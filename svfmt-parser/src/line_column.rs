//! Translation of byte offsets into line/column positions.
//!
//!     The map stores one byte offset per beginning-of-line: offset 0 first,
//!     then the position immediately after each newline. Lookup is a binary
//!     search, and the column is counted in characters rather than bytes so
//!     multi-byte UTF-8 code points report the position a user would expect.

use std::fmt;

use serde::Serialize;

/// Line and column, both 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for LineColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 1-based for humans.
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// A complete range: start inclusive, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineColumnRange {
    pub start: LineColumn,
    pub end: LineColumn,
}

impl LineColumnRange {
    pub fn contains(&self, pos: LineColumn) -> bool {
        pos >= self.start && pos < self.end
    }
}

impl fmt::Display for LineColumnRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Byte-offset to line/column map over one contiguous text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineColumnMap {
    // Index: line number. Value: byte offset starting that line. The first
    // entry is always 0; the last is the offset following the last newline.
    beginning_of_line_offsets: Vec<usize>,
}

impl LineColumnMap {
    pub fn new(text: &str) -> Self {
        let mut offsets = Vec::with_capacity(text.lines().count() + 1);
        offsets.push(0);
        for (pos, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                offsets.push(pos + 1);
            }
        }
        LineColumnMap { beginning_of_line_offsets: offsets }
    }

    pub fn is_empty(&self) -> bool {
        self.beginning_of_line_offsets.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.beginning_of_line_offsets.len()
    }

    /// Byte offset at which the 0-based line begins; the final offset when
    /// `lineno` runs past the end.
    pub fn offset_at_line(&self, lineno: usize) -> usize {
        let index = lineno.min(self.beginning_of_line_offsets.len() - 1);
        self.beginning_of_line_offsets[index]
    }

    /// Byte offset of the start of the last line.
    pub fn last_line_offset(&self) -> usize {
        *self.beginning_of_line_offsets.last().unwrap_or(&0)
    }

    pub fn beginning_of_line_offsets(&self) -> &[usize] {
        &self.beginning_of_line_offsets
    }

    /// 0-based line number containing the byte offset.
    pub fn line_at_offset(&self, offset: usize) -> usize {
        self.beginning_of_line_offsets
            .partition_point(|&start| start <= offset)
            .saturating_sub(1)
    }

    /// Line and column at the byte offset. The column counts characters, not
    /// bytes, so it needs the `text` the map was built from.
    pub fn line_column_at_offset(&self, text: &str, offset: usize) -> LineColumn {
        let offset = offset.min(text.len());
        let line = self.line_at_offset(offset);
        let line_start = self.beginning_of_line_offsets[line];
        let column = text[line_start..offset].chars().count();
        LineColumn { line, column }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        let map = LineColumnMap::new("");
        assert_eq!(map.beginning_of_line_offsets(), &[0]);
        assert_eq!(map.line_column_at_offset("", 0), LineColumn { line: 0, column: 0 });
    }

    #[test]
    fn test_single_line_no_newline() {
        let text = "hello";
        let map = LineColumnMap::new(text);
        assert_eq!(map.beginning_of_line_offsets(), &[0]);
        assert_eq!(map.line_column_at_offset(text, 3), LineColumn { line: 0, column: 3 });
    }

    #[test]
    fn test_lines_and_columns() {
        let text = "ab\ncde\n\nf";
        let map = LineColumnMap::new(text);
        assert_eq!(map.beginning_of_line_offsets(), &[0, 3, 7, 8]);
        assert_eq!(map.line_at_offset(0), 0);
        assert_eq!(map.line_at_offset(2), 0); // the newline belongs to line 0
        assert_eq!(map.line_at_offset(3), 1);
        assert_eq!(map.line_at_offset(7), 2);
        assert_eq!(map.line_column_at_offset(text, 5), LineColumn { line: 1, column: 2 });
        assert_eq!(map.line_column_at_offset(text, 8), LineColumn { line: 3, column: 0 });
    }

    #[test]
    fn test_multibyte_column_counts_characters() {
        // "héllo" - 'é' is two bytes.
        let text = "h\u{e9}llo\nx";
        let map = LineColumnMap::new(text);
        // Offset of 'l' is 3 bytes in, but column 2.
        assert_eq!(map.line_column_at_offset(text, 3), LineColumn { line: 0, column: 2 });
    }

    #[test]
    fn test_offset_at_line_clamps() {
        let map = LineColumnMap::new("a\nb\n");
        assert_eq!(map.offset_at_line(0), 0);
        assert_eq!(map.offset_at_line(1), 2);
        assert_eq!(map.offset_at_line(2), 4);
        assert_eq!(map.offset_at_line(99), 4);
    }

    #[test]
    fn test_display_is_one_based() {
        let pos = LineColumn { line: 0, column: 4 };
        assert_eq!(pos.to_string(), "1:5");
    }
}
