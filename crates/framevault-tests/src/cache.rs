//! Integration tests for the cache subsystem.
//!
//! Exercises the index, job admission, quantizer, and event plumbing
//! together the way a render dispatcher drives them.

use framevault_cache::{CacheEvent, CacheObserver, ChannelObserver, FrameHashCache};
use framevault_core::{ContentHash, FrameRate, RationalTime, TimeRange, TimeRangeList};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

// ── Helpers ────────────────────────────────────────────────────

fn frame(n: i64) -> RationalTime {
    RationalTime::new(n, 24)
}

fn span(start: RationalTime, end: RationalTime) -> TimeRange {
    TimeRange::from_start_end(start, end)
}

fn hash(byte: u8) -> ContentHash {
    ContentHash::from([byte, 0xde, 0xad, 0xbe, 0xef])
}

fn cache_24() -> FrameHashCache {
    FrameHashCache::new(FrameRate::FPS_24.frame_duration())
}

// ── Render dispatch flow ───────────────────────────────────────

#[test]
fn invalidation_drives_rerender_planning() {
    let cache = cache_24();

    // An edit marks two frames dirty.
    cache.invalidate(span(frame(3), frame(5)));

    let todo = cache.invalidated_frames();
    assert_eq!(todo, vec![frame(3), frame(4)]);

    // A job claims the dirty region and renders it.
    cache.register_job(span(frame(3), frame(5)), 1);
    for &time in &todo {
        assert!(cache.set_hash(time, hash(0xaa), 1));
    }

    assert!(cache.invalidated_frames().is_empty());
}

#[test]
fn edit_during_render_discards_obsolete_results() {
    let cache = cache_24();

    // A wide render job starts.
    cache.register_job(span(frame(0), frame(240)), 1);

    // An edit lands: a narrower region is re-claimed by a newer job.
    cache.invalidate(span(frame(0), frame(120)));
    cache.register_job(span(frame(0), frame(120)), 2);

    // The old job's late result inside the re-claimed window is dropped,
    // but its results outside it remain good.
    assert!(!cache.set_hash(frame(60), hash(0x01), 1));
    assert!(cache.set_hash(frame(180), hash(0x02), 1));

    // The new job fills the window.
    assert!(cache.set_hash(frame(60), hash(0x03), 2));
    assert_eq!(cache.get_hash(frame(60)), Some(hash(0x03)));
}

#[test]
fn ripple_insert_then_rerender_gap() {
    let cache = cache_24();
    cache.register_job(span(frame(0), frame(10)), 1);
    for n in 0..6 {
        cache.set_hash(frame(n), hash(n as u8), 1);
    }

    // Insert two frames of content at frame 2.
    cache.shift(frame(2), frame(4));

    // Entries before the edit stay; the tail moved; the gap is dirty.
    assert_eq!(cache.get_hash(frame(1)), Some(hash(1)));
    assert_eq!(cache.get_hash(frame(4)), Some(hash(2)));
    assert_eq!(cache.get_hash(frame(7)), Some(hash(5)));
    assert_eq!(cache.invalidated_frames(), vec![frame(2), frame(3)]);

    // A fresh job re-renders exactly the gap.
    cache.register_job(span(frame(2), frame(4)), 2);
    assert!(cache.set_hash(frame(2), hash(0xf2), 2));
    assert!(cache.set_hash(frame(3), hash(0xf3), 2));
    assert!(cache.invalidated_frames().is_empty());
}

#[test]
fn eviction_feeds_rerender_planning() {
    let cache = cache_24();
    cache.register_job(span(frame(0), frame(10)), 1);

    // Three frames share one hash (still content), one differs.
    cache.set_hash(frame(0), hash(0x55), 1);
    cache.set_hash(frame(1), hash(0x55), 1);
    cache.set_hash(frame(2), hash(0x66), 1);
    cache.set_hash(frame(3), hash(0x55), 1);

    // The disk manager evicted the shared file; drop its references.
    let dropped = cache.take_frames_with_hash(&hash(0x55));
    assert_eq!(dropped, vec![frame(0), frame(1), frame(3)]);

    // Exactly those frames need re-rendering.
    assert_eq!(
        cache.invalidated_frames(),
        vec![frame(0), frame(1), frame(3)]
    );
    assert_eq!(cache.get_hash(frame(2)), Some(hash(0x66)));
}

#[test]
fn quantizer_matches_cache_timebase() {
    let cache = cache_24();
    let ranges = TimeRangeList::from(span(RationalTime::ZERO, frame(2)));
    assert_eq!(
        cache.frame_times_for(ranges),
        vec![RationalTime::ZERO, frame(1)]
    );

    cache.set_timebase(RationalTime::new(1, 30));
    let ranges = TimeRangeList::from(span(RationalTime::ZERO, RationalTime::new(2, 30)));
    assert_eq!(
        cache.frame_times_for(ranges),
        vec![RationalTime::ZERO, RationalTime::new(1, 30)]
    );
}

// ── Event delivery ─────────────────────────────────────────────

#[test]
fn observers_see_validation_and_invalidation() {
    let cache = cache_24();
    let (observer, rx) = ChannelObserver::new();
    cache.subscribe(observer);

    cache.register_job(span(frame(0), frame(10)), 1);
    cache.set_hash(frame(0), hash(0xaa), 1);
    cache.invalidate(span(frame(0), frame(1)));

    let events: Vec<CacheEvent> = rx.try_iter().collect();
    assert_eq!(
        events,
        vec![
            CacheEvent::Validated(span(frame(0), frame(1))),
            CacheEvent::Invalidated(span(frame(0), frame(1))),
        ]
    );
}

/// Observer that calls back into the cache on every event.
#[derive(Default)]
struct ReentrantObserver {
    cache: OnceLock<Arc<FrameHashCache>>,
    reads: AtomicUsize,
}

impl CacheObserver for ReentrantObserver {
    fn cache_event(&self, _event: CacheEvent) {
        if let Some(cache) = self.cache.get() {
            // Would deadlock if events were emitted under the lock.
            let _ = cache.get_hash(RationalTime::ZERO);
            let _ = cache.invalidated_ranges();
            self.reads.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[test]
fn observers_may_reenter_the_cache() {
    let cache = Arc::new(cache_24());
    let observer = Arc::new(ReentrantObserver::default());
    observer.cache.set(cache.clone()).ok().unwrap();
    cache.subscribe(observer.clone());

    cache.register_job(span(frame(0), frame(10)), 1);
    cache.set_hash(frame(0), hash(0xaa), 1);
    cache.invalidate(span(frame(2), frame(4)));
    cache.take_frames_with_hash(&hash(0xaa));

    // set_hash + invalidate + one per taken frame
    assert_eq!(observer.reads.load(Ordering::SeqCst), 3);
}

// ── Concurrent workers ─────────────────────────────────────────

#[test]
fn parallel_workers_race_without_corruption() {
    let cache = Arc::new(cache_24());
    cache.register_job(span(frame(0), frame(1024)), 1);
    cache.register_job(span(frame(0), frame(512)), 2);

    let handles: Vec<_> = (0..4u8)
        .map(|worker| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                let stamp = if worker % 2 == 0 { 1 } else { 2 };
                for n in 0..256 {
                    cache.set_hash(frame(n), hash(worker), stamp);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Every admitted frame carries some worker's hash; frames inside the
    // newer claim's window only ever admitted stamp-2 workers.
    for n in 0..256 {
        let written = cache.get_hash(frame(n)).expect("frame must be cached");
        let worker = written.as_bytes()[0];
        assert!(worker % 2 == 1, "frame {n} admitted a superseded result");
    }
}
