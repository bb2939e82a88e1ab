//! Quantization of time ranges to frame-aligned render times.

use framevault_core::{RationalTime, TimeRange, TimeRangeList};

/// Convert a set of ranges into the frame times that cover it.
///
/// Emits an ordered, duplicate-free list of timebase-aligned times whose
/// `[t, t + timebase)` slots cover every instant in `ranges` — including
/// range boundaries that do not land on a timebase multiple, which are
/// covered by the frame slot containing them.
pub fn frame_times(mut ranges: TimeRangeList, timebase: RationalTime) -> Vec<RationalTime> {
    debug_assert!(timebase > RationalTime::ZERO, "timebase must be positive");
    if timebase <= RationalTime::ZERO {
        return Vec::new();
    }

    let mut times = Vec::new();

    while let Some(range) = ranges.first() {
        let start = range.start;
        let snapped = start.snap_to_timebase(timebase);

        // If snapping rounded up, the range starts inside the previous
        // frame's slot.
        let frame = if snapped > start {
            snapped - timebase
        } else {
            snapped
        };

        times.push(frame);
        ranges.remove(TimeRange::from_start_end(frame, frame + timebase));
    }

    times
}
