//! Sets of disjoint time ranges.
//!
//! Used for invalidation accounting: the regions of a timeline whose cached
//! frames are stale. Ranges are kept sorted, non-empty, and non-touching.

use crate::time::{RationalTime, TimeRange};
use smallvec::SmallVec;

/// An ordered set of disjoint half-open time ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeRangeList {
    ranges: SmallVec<[TimeRange; 4]>,
}

impl TimeRangeList {
    /// Create an empty range list.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no time is covered.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of disjoint ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// The earliest range, if any.
    pub fn first(&self) -> Option<TimeRange> {
        self.ranges.first().copied()
    }

    /// All ranges in ascending order.
    pub fn ranges(&self) -> &[TimeRange] {
        &self.ranges
    }

    /// True if some range covers `time`.
    pub fn contains_time(&self, time: RationalTime) -> bool {
        self.ranges.iter().any(|r| r.contains(time))
    }

    /// Add `range` to the set, merging with any overlapping or touching
    /// ranges.
    pub fn insert(&mut self, range: TimeRange) {
        if range.is_empty() {
            return;
        }

        let mut start = range.start;
        let mut end = range.end();
        let mut merged: SmallVec<[TimeRange; 4]> = SmallVec::new();
        let mut placed = false;

        for &r in &self.ranges {
            if r.end() < start {
                merged.push(r);
            } else if r.start > end {
                if !placed {
                    merged.push(TimeRange::from_start_end(start, end));
                    placed = true;
                }
                merged.push(r);
            } else {
                start = start.min(r.start);
                end = end.max(r.end());
            }
        }

        if !placed {
            merged.push(TimeRange::from_start_end(start, end));
        }

        self.ranges = merged;
    }

    /// Subtract `range` from the set. Ranges straddling a cut boundary are
    /// shrunk; a range containing the whole cut is split in two.
    pub fn remove(&mut self, range: TimeRange) {
        if range.is_empty() {
            return;
        }

        let cut_start = range.start;
        let cut_end = range.end();
        let mut kept: SmallVec<[TimeRange; 4]> = SmallVec::new();

        for &r in &self.ranges {
            if r.end() <= cut_start || r.start >= cut_end {
                kept.push(r);
                continue;
            }
            if r.start < cut_start {
                kept.push(TimeRange::from_start_end(r.start, cut_start));
            }
            if r.end() > cut_end {
                kept.push(TimeRange::from_start_end(cut_end, r.end()));
            }
        }

        self.ranges = kept;
    }

    /// Drop all coverage at or beyond `at`.
    pub fn truncate(&mut self, at: RationalTime) {
        let mut kept: SmallVec<[TimeRange; 4]> = SmallVec::new();

        for &r in &self.ranges {
            if r.end() <= at {
                kept.push(r);
            } else if r.start < at {
                kept.push(TimeRange::from_start_end(r.start, at));
            }
        }

        self.ranges = kept;
    }
}

impl From<TimeRange> for TimeRangeList {
    fn from(range: TimeRange) -> Self {
        let mut list = Self::new();
        list.insert(range);
        list
    }
}

impl FromIterator<TimeRange> for TimeRangeList {
    fn from_iter<I: IntoIterator<Item = TimeRange>>(iter: I) -> Self {
        let mut list = Self::new();
        for range in iter {
            list.insert(range);
        }
        list
    }
}
