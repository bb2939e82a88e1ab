//! The time-to-hash index.
//!
//! One mutex spans each operation's full read/modify span; admission is
//! judged at the instant the lock is taken, and observers are notified only
//! after the guard is released.

use crate::events::{CacheEvent, CacheObserver};
use crate::jobs::JobTracker;
use crate::quantize;
use framevault_core::{ContentHash, RationalTime, TimeRange, TimeRangeList};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Timeline edits the cache owner forwards to its caches.
///
/// Implemented by [`FrameHashCache`]; having the owner talk to a trait
/// keeps the timeline-edit source decoupled from cache internals.
pub trait TimelineListener {
    /// The timeline length changed from `old` to `new`.
    fn length_changed(&self, old: RationalTime, new: RationalTime);
    /// Cached results in `range` are stale.
    fn invalidate(&self, range: TimeRange);
    /// Content at and after `from` rippled to `to`.
    fn shift(&self, from: RationalTime, to: RationalTime);
}

struct CacheState {
    frames: BTreeMap<RationalTime, ContentHash>,
    jobs: JobTracker,
    invalidated: TimeRangeList,
    timebase: RationalTime,
}

/// Maps quantized timeline positions to content hashes of rendered frames.
///
/// Render workers register job claims, render, and submit results through
/// [`set_hash`](Self::set_hash); results from superseded jobs are silently
/// discarded. Timeline edits arrive through the [`TimelineListener`]
/// surface independently of the workers.
pub struct FrameHashCache {
    state: Mutex<CacheState>,
    observers: Mutex<Vec<Arc<dyn CacheObserver>>>,
}

impl FrameHashCache {
    /// Create an empty cache quantizing to `timebase`.
    pub fn new(timebase: RationalTime) -> Self {
        Self {
            state: Mutex::new(CacheState {
                frames: BTreeMap::new(),
                jobs: JobTracker::new(),
                invalidated: TimeRangeList::new(),
                timebase,
            }),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Register an observer for validated/invalidated notifications.
    pub fn subscribe(&self, observer: Arc<dyn CacheObserver>) {
        self.observers.lock().push(observer);
    }

    // Must only be called with the state lock released.
    fn notify(&self, events: &[CacheEvent]) {
        if events.is_empty() {
            return;
        }
        let observers = self.observers.lock().clone();
        for observer in &observers {
            for &event in events {
                observer.cache_event(event);
            }
        }
    }

    // ── Hash map access ─────────────────────────────────────────────

    /// The hash cached for `time`, if any.
    pub fn get_hash(&self, time: RationalTime) -> Option<ContentHash> {
        self.state.lock().frames.get(&time).cloned()
    }

    /// Record a rendered result for `time`.
    ///
    /// Admission is checked against the job claims: a result from a
    /// superseded job is silently dropped and `false` is returned — an
    /// expected race outcome, not an error. On acceptance the frame's slot
    /// is removed from the invalidated set and a `Validated` event is
    /// emitted.
    pub fn set_hash(&self, time: RationalTime, hash: ContentHash, stamp: u64) -> bool {
        let validated;
        {
            let mut state = self.state.lock();

            if !state.jobs.is_current(time, stamp) {
                trace!(%time, stamp, "discarding stale render result");
                return false;
            }

            validated = TimeRange::from_start_end(time, time + state.timebase);
            state.frames.insert(time, hash);
            state.invalidated.remove(validated);
        }
        self.notify(&[CacheEvent::Validated(validated)]);
        true
    }

    /// All times currently mapped to `hash`, in ascending order.
    pub fn frames_with_hash(&self, hash: &ContentHash) -> Vec<RationalTime> {
        let state = self.state.lock();
        state
            .frames
            .iter()
            .filter(|&(_, h)| h == hash)
            .map(|(&time, _)| time)
            .collect()
    }

    /// Remove every entry mapped to `hash` and mark their slots stale.
    ///
    /// Used when a cached file is evicted from disk: the in-memory
    /// references must be dropped with it. Emits one `Invalidated` event
    /// per removed frame and returns the removed times.
    pub fn take_frames_with_hash(&self, hash: &ContentHash) -> Vec<RationalTime> {
        let (times, timebase) = {
            let mut state = self.state.lock();

            let times: Vec<RationalTime> = state
                .frames
                .iter()
                .filter(|&(_, h)| h == hash)
                .map(|(&time, _)| time)
                .collect();

            let timebase = state.timebase;
            for &time in &times {
                state.frames.remove(&time);
                state
                    .invalidated
                    .insert(TimeRange::from_start_end(time, time + timebase));
            }

            (times, timebase)
        };

        let events: Vec<CacheEvent> = times
            .iter()
            .map(|&time| CacheEvent::Invalidated(TimeRange::from_start_end(time, time + timebase)))
            .collect();
        self.notify(&events);

        times
    }

    /// Copy of the full time-to-hash map.
    pub fn snapshot(&self) -> BTreeMap<RationalTime, ContentHash> {
        self.state.lock().frames.clone()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.state.lock().frames.len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.state.lock().frames.is_empty()
    }

    // ── Timebase ────────────────────────────────────────────────────

    /// Update the quantization unit. Existing entries are not re-keyed.
    pub fn set_timebase(&self, timebase: RationalTime) {
        self.state.lock().timebase = timebase;
    }

    /// The active quantization unit.
    pub fn timebase(&self) -> RationalTime {
        self.state.lock().timebase
    }

    // ── Job claims ──────────────────────────────────────────────────

    /// Declare that the job with `stamp` is rendering `range`.
    pub fn register_job(&self, range: TimeRange, stamp: u64) {
        self.state.lock().jobs.register(range, stamp);
    }

    /// Retire claims with stamps at or below `stamp`; see
    /// [`JobTracker::retire_through`].
    pub fn retire_jobs_through(&self, stamp: u64) {
        self.state.lock().jobs.retire_through(stamp);
    }

    // ── Invalidation accounting ─────────────────────────────────────

    /// Snapshot of the currently invalidated regions.
    pub fn invalidated_ranges(&self) -> TimeRangeList {
        self.state.lock().invalidated.clone()
    }

    /// Frame times that must be re-rendered, quantized to the active
    /// timebase.
    pub fn invalidated_frames(&self) -> Vec<RationalTime> {
        let (ranges, timebase) = {
            let state = self.state.lock();
            (state.invalidated.clone(), state.timebase)
        };
        quantize::frame_times(ranges, timebase)
    }

    /// Frame times covering `ranges` at the active timebase.
    pub fn frame_times_for(&self, ranges: TimeRangeList) -> Vec<RationalTime> {
        let timebase = self.timebase();
        quantize::frame_times(ranges, timebase)
    }

    // ── Timeline edits ──────────────────────────────────────────────

    /// Handle a timeline length change.
    ///
    /// Content at or beyond the new end is unreachable: on a shrink, those
    /// entries are dropped and the invalidated set is clipped. Growth is a
    /// no-op.
    pub fn length_changed(&self, old: RationalTime, new: RationalTime) {
        if new >= old {
            return;
        }
        let mut state = self.state.lock();
        state.frames.retain(|&time, _| time < new);
        state.invalidated.truncate(new);
        debug!(%old, %new, remaining = state.frames.len(), "timeline shortened");
    }

    /// Mark `range` stale: entries inside it are dropped and the region is
    /// recorded for re-render. Emits `Invalidated(range)`.
    pub fn invalidate(&self, range: TimeRange) {
        if range.is_empty() {
            return;
        }
        {
            let mut state = self.state.lock();
            state.frames.retain(|&time, _| !range.contains(time));
            state.invalidated.insert(range);
        }
        self.notify(&[CacheEvent::Invalidated(range)]);
    }

    /// Handle a ripple edit moving content at/after `from` to `to`.
    ///
    /// Shifting earlier consumes `[to, from)` — entries and invalidation
    /// coverage there are dropped. Shifting later opens a never-rendered
    /// gap `[from, to)`, which becomes invalidated. Everything at/after
    /// `from` moves by `to - from`; everything before the edit point is
    /// untouched.
    pub fn shift(&self, from: RationalTime, to: RationalTime) {
        let delta = to - from;
        if delta == RationalTime::ZERO {
            return;
        }

        let mut inserted_gap = None;
        {
            let mut state = self.state.lock();

            if delta < RationalTime::ZERO {
                let consumed = TimeRange::from_start_end(to, from);
                state.frames.retain(|&time, _| !consumed.contains(time));
                state.invalidated.remove(consumed);
            }

            // Collect the moving entries first, then reinsert at shifted
            // keys: destinations can never collide with a still-unmoved
            // source.
            let tail = state.frames.split_off(&from);
            for (time, hash) in tail {
                state.frames.insert(time + delta, hash);
            }

            let mut remapped = TimeRangeList::new();
            for &r in state.invalidated.ranges() {
                if r.end() <= from {
                    remapped.insert(r);
                } else if r.start >= from {
                    remapped.insert(r.offset(delta));
                } else {
                    remapped.insert(TimeRange::from_start_end(r.start, from));
                    remapped.insert(TimeRange::from_start_end(from, r.end()).offset(delta));
                }
            }
            state.invalidated = remapped;

            if delta > RationalTime::ZERO {
                let gap = TimeRange::from_start_end(from, to);
                state.invalidated.insert(gap);
                inserted_gap = Some(gap);
            }

            debug!(%from, %to, entries = state.frames.len(), "shifted cache entries");
        }

        if let Some(gap) = inserted_gap {
            self.notify(&[CacheEvent::Invalidated(gap)]);
        }
    }
}

impl TimelineListener for FrameHashCache {
    fn length_changed(&self, old: RationalTime, new: RationalTime) {
        FrameHashCache::length_changed(self, old, new);
    }

    fn invalidate(&self, range: TimeRange) {
        FrameHashCache::invalidate(self, range);
    }

    fn shift(&self, from: RationalTime, to: RationalTime) {
        FrameHashCache::shift(self, from, to);
    }
}
