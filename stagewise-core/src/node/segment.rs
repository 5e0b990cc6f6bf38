//! Layout of a node's shared index/value buffer.
//!
//! ```text
//! | row 0 | row 1 | ... | row n-1 | col lower | col upper | obj | row lower | row upper |
//! ^starts[0]                     ^starts[n]  ^starts[n+1] ...              ^starts[n+5]
//! ```

use std::ops::Range;

/// Bound and objective categories stored after the matrix rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Column lower bounds
    ColLower,
    /// Column upper bounds
    ColUpper,
    /// Objective coefficients
    Objective,
    /// Row lower bounds
    RowLower,
    /// Row upper bounds
    RowUpper,
}

impl Segment {
    /// All categories in buffer order.
    pub const ALL: [Segment; 5] = [
        Segment::ColLower,
        Segment::ColUpper,
        Segment::Objective,
        Segment::RowLower,
        Segment::RowUpper,
    ];

    /// Position in buffer order.
    #[inline]
    pub fn ordinal(self) -> usize {
        match self {
            Segment::ColLower => 0,
            Segment::ColUpper => 1,
            Segment::Objective => 2,
            Segment::RowLower => 3,
            Segment::RowUpper => 4,
        }
    }

    /// True for categories indexed by column.
    #[inline]
    pub fn is_column(self) -> bool {
        matches!(self, Segment::ColLower | Segment::ColUpper | Segment::Objective)
    }
}

/// Offsets into the shared buffer: `nrow + 1` row starts followed by the
/// end offset of each of the five categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SegmentOffsets {
    nrow: usize,
    starts: Vec<usize>,
}

impl SegmentOffsets {
    pub(crate) fn with_rows(nrow: usize) -> Self {
        let mut starts = Vec::with_capacity(nrow + 1 + Segment::ALL.len());
        starts.push(0);
        Self { nrow, starts }
    }

    /// Close the next row or category at buffer position `end`.
    pub(crate) fn close(&mut self, end: usize) {
        debug_assert!(self.starts.last().is_some_and(|&s| s <= end));
        self.starts.push(end);
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.starts.len() == self.nrow + 1 + Segment::ALL.len()
    }

    #[inline]
    pub(crate) fn row(&self, local_row: usize) -> Range<usize> {
        self.starts[local_row]..self.starts[local_row + 1]
    }

    #[inline]
    pub(crate) fn matrix(&self) -> Range<usize> {
        0..self.starts[self.nrow]
    }

    #[inline]
    pub(crate) fn segment(&self, seg: Segment) -> Range<usize> {
        let k = self.nrow + seg.ordinal();
        self.starts[k]..self.starts[k + 1]
    }

    pub(crate) fn total(&self) -> usize {
        self.starts.last().copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_ranges() {
        let mut off = SegmentOffsets::with_rows(2);
        for end in [2, 3, 4, 4, 6, 6, 7] {
            off.close(end);
        }
        assert!(off.is_complete());
        assert_eq!(off.row(0), 0..2);
        assert_eq!(off.row(1), 2..3);
        assert_eq!(off.matrix(), 0..3);
        assert_eq!(off.segment(Segment::ColLower), 3..4);
        assert_eq!(off.segment(Segment::ColUpper), 4..4);
        assert_eq!(off.segment(Segment::Objective), 4..6);
        assert_eq!(off.segment(Segment::RowLower), 6..6);
        assert_eq!(off.segment(Segment::RowUpper), 6..7);
        assert_eq!(off.total(), 7);
    }

    #[test]
    fn test_segment_order() {
        for (k, seg) in Segment::ALL.iter().enumerate() {
            assert_eq!(seg.ordinal(), k);
        }
        assert!(Segment::Objective.is_column());
        assert!(!Segment::RowLower.is_column());
    }
}
