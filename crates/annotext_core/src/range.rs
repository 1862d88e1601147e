//! Half-open character ranges within a single block.
//!
//! Offsets count Unicode scalar values, not bytes. A range whose start is
//! greater than its end is "reversed" (interactive selections produce these
//! transiently); every comparison normalizes first.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open interval `[start_offset, end_offset)` within `blocks[block_index]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Range {
    pub block_index: usize,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:[{}, {})",
            self.block_index, self.start_offset, self.end_offset
        )
    }
}

impl Range {
    pub fn new(block_index: usize, start_offset: usize, end_offset: usize) -> Self {
        Self {
            block_index,
            start_offset,
            end_offset,
        }
    }

    pub fn is_reversed(&self) -> bool {
        self.start_offset > self.end_offset
    }

    /// Swap the offsets of a reversed range; identity otherwise.
    #[must_use]
    pub fn normalize(self) -> Self {
        if self.is_reversed() {
            Self::new(self.block_index, self.end_offset, self.start_offset)
        } else {
            self
        }
    }

    pub fn len(&self) -> usize {
        self.start_offset.abs_diff(self.end_offset)
    }

    pub fn is_empty(&self) -> bool {
        self.start_offset == self.end_offset
    }

    /// Same block and a positive-length intersection.
    pub fn overlaps(&self, other: &Range) -> bool {
        self.intersect(other).is_some()
    }

    /// Same block and `other` lies within `self`. Equal bounds count.
    pub fn contains(&self, other: &Range) -> bool {
        let a = self.normalize();
        let b = other.normalize();
        a.block_index == b.block_index
            && a.start_offset <= b.start_offset
            && b.end_offset <= a.end_offset
    }

    /// Positive-length intersection, or `None` when disjoint or on different blocks.
    pub fn intersect(&self, other: &Range) -> Option<Range> {
        let a = self.normalize();
        let b = other.normalize();
        if a.block_index != b.block_index {
            return None;
        }
        let start = a.start_offset.max(b.start_offset);
        let end = a.end_offset.min(b.end_offset);
        (start < end).then(|| Range::new(a.block_index, start, end))
    }

    /// Extract the covered text from `block`.
    ///
    /// # Errors
    /// Returns [`EngineError::OutOfBounds`] when the range ends past the block.
    pub fn substring(&self, block: &str) -> Result<String, EngineError> {
        let range = self.normalize();
        let len = block.chars().count();
        if range.end_offset > len {
            return Err(EngineError::OutOfBounds { range, len });
        }
        Ok(block
            .chars()
            .skip(range.start_offset)
            .take(range.len())
            .collect())
    }

    /// Check that the range addresses an existing block and stays inside it.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidRange`] for a missing block and
    /// [`EngineError::OutOfBounds`] for offsets past the block end.
    pub fn validate(&self, blocks: &[String]) -> Result<(), EngineError> {
        let Some(block) = blocks.get(self.block_index) else {
            return Err(EngineError::invalid_range(
                *self,
                format!("document has {} blocks", blocks.len()),
            ));
        };
        let range = self.normalize();
        let len = block.chars().count();
        if range.end_offset > len {
            return Err(EngineError::OutOfBounds { range, len });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(start: usize, end: usize) -> Range {
        Range::new(0, start, end)
    }

    #[test]
    fn normalize_swaps_reversed_offsets() {
        assert_eq!(r(5, 2).normalize(), r(2, 5));
        assert_eq!(r(2, 5).normalize(), r(2, 5));
        assert!(r(5, 2).is_reversed());
        assert_eq!(r(5, 2).len(), 3);
    }

    #[test]
    fn overlap_requires_positive_length_on_same_block() {
        assert!(r(0, 4).overlaps(&r(3, 6)));
        assert!(!r(0, 3).overlaps(&r(3, 6)), "touching ranges do not overlap");
        assert!(!r(0, 4).overlaps(&Range::new(1, 0, 4)));
        assert!(r(4, 0).overlaps(&r(3, 6)), "reversed input is normalized");
    }

    #[test]
    fn overlap_is_symmetric() {
        let samples = [r(0, 3), r(2, 5), r(5, 2), r(3, 3), r(0, 10), r(7, 9)];
        for a in samples {
            for b in samples {
                assert_eq!(a.overlaps(&b), b.overlaps(&a), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn mutual_containment_iff_normalized_equal() {
        let samples = [r(0, 3), r(3, 0), r(1, 3), r(0, 4), r(2, 2)];
        for a in samples {
            for b in samples {
                let mutual = a.contains(&b) && b.contains(&a);
                assert_eq!(mutual, a.normalize() == b.normalize(), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn intersect_returns_shared_interval() {
        assert_eq!(r(0, 5).intersect(&r(3, 8)), Some(r(3, 5)));
        assert_eq!(r(0, 3).intersect(&r(3, 8)), None);
        assert_eq!(r(0, 5).intersect(&Range::new(2, 0, 5)), None);
    }

    #[test]
    fn substring_counts_chars_not_bytes() {
        let block = "AB。CD！EF";
        assert_eq!(r(0, 3).substring(block).expect("in bounds"), "AB。");
        assert_eq!(r(6, 3).substring(block).expect("in bounds"), "CD！");
        let err = r(5, 20).substring(block).expect_err("past the end");
        assert!(matches!(err, EngineError::OutOfBounds { len: 8, .. }));
    }

    #[test]
    fn validate_rejects_missing_block() {
        let blocks = vec!["abc".to_string()];
        assert!(r(0, 3).validate(&blocks).is_ok());
        assert!(matches!(
            Range::new(1, 0, 1).validate(&blocks),
            Err(EngineError::InvalidRange { .. })
        ));
        assert!(matches!(
            r(0, 4).validate(&blocks),
            Err(EngineError::OutOfBounds { .. })
        ));
    }
}
