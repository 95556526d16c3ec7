//! Interval sets over byte offsets and line numbers.
//!
//!     Half-open, sorted, non-overlapping intervals with monotonic
//!     insertion merging adjacent and overlapping ranges. The formatter
//!     uses a byte-offset set for disabled regions and a line-number set
//!     for incremental (`--lines`) formatting.

use svfmt_parser::line_column::LineColumnMap;

/// Sorted, non-overlapping set of `[start, end)` intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalSet {
    ranges: Vec<(usize, usize)>,
}

impl IntervalSet {
    pub fn new() -> Self {
        IntervalSet::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[(usize, usize)] {
        &self.ranges
    }

    /// Insert an interval, merging with overlapping or adjacent ones.
    pub fn add(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let mut merged = (start, end);
        let mut result = Vec::with_capacity(self.ranges.len() + 1);
        let mut placed = false;
        for &(s, e) in &self.ranges {
            if e < merged.0 {
                result.push((s, e));
            } else if s > merged.1 {
                if !placed {
                    result.push(merged);
                    placed = true;
                }
                result.push((s, e));
            } else {
                merged = (merged.0.min(s), merged.1.max(e));
            }
        }
        if !placed {
            result.push(merged);
        }
        self.ranges = result;
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.ranges
            .iter()
            .any(|&(s, e)| s <= offset && offset < e)
    }

    /// True when `[start, end)` intersects any interval in the set.
    pub fn intersects(&self, start: usize, end: usize) -> bool {
        self.ranges.iter().any(|&(s, e)| s < end && start < e)
    }

    pub fn union(&mut self, other: &IntervalSet) {
        for &(s, e) in &other.ranges {
            self.add(s, e);
        }
    }
}

/// Alias used for disabled-formatting byte ranges.
pub type ByteOffsetSet = IntervalSet;

/// Set of 0-based line numbers, stored as intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineNumberSet {
    set: IntervalSet,
}

impl LineNumberSet {
    pub fn new() -> Self {
        LineNumberSet::default()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn add_line(&mut self, line: usize) {
        self.set.add(line, line + 1);
    }

    pub fn add_range(&mut self, first: usize, last_exclusive: usize) {
        self.set.add(first, last_exclusive);
    }

    pub fn contains(&self, line: usize) -> bool {
        self.set.contains(line)
    }

    /// Convert to byte ranges over `text`, for feeding the formatter's
    /// disabled-range machinery with the *complement* of the requested
    /// lines.
    pub fn complement_byte_ranges(&self, text: &str) -> ByteOffsetSet {
        let map = LineColumnMap::new(text);
        let mut result = ByteOffsetSet::new();
        let line_count = map.line_count();
        for line in 0..line_count {
            if !self.contains(line) {
                let start = map.offset_at_line(line);
                let end = if line + 1 < line_count {
                    map.offset_at_line(line + 1)
                } else {
                    text.len()
                };
                result.add(start, end);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_merges_overlaps() {
        let mut set = IntervalSet::new();
        set.add(5, 10);
        set.add(0, 2);
        set.add(8, 12);
        assert_eq!(set.ranges(), &[(0, 2), (5, 12)]);
        set.add(2, 5);
        assert_eq!(set.ranges(), &[(0, 12)]);
    }

    #[test]
    fn test_empty_interval_ignored() {
        let mut set = IntervalSet::new();
        set.add(3, 3);
        assert!(set.is_empty());
    }

    #[test]
    fn test_contains_and_intersects() {
        let mut set = IntervalSet::new();
        set.add(4, 8);
        assert!(set.contains(4));
        assert!(!set.contains(8));
        assert!(set.intersects(7, 20));
        assert!(!set.intersects(8, 20));
        assert!(!set.intersects(0, 4));
    }

    #[test]
    fn test_line_set_complement() {
        let text = "a\nb\nc\n";
        let mut lines = LineNumberSet::new();
        lines.add_line(1);
        let ranges = lines.complement_byte_ranges(text);
        // Lines 0 and 2.. are disabled (kept verbatim); line 1 is formatted.
        assert!(ranges.contains(0));
        assert!(!ranges.contains(2));
        assert!(ranges.contains(4));
    }
}
