//! Integration tests for the persist path.
//!
//! Drives the cache and the frame store together: admitted results go to
//! disk, duplicate content is detected before re-encoding, and evictions
//! flow back into invalidation.

use framevault_cache::FrameHashCache;
use framevault_core::{
    ContentHash, FrameBuffer, FrameRate, PixelFormat, RationalTime, TimeRange, VideoParams,
};
use framevault_store::{DiskManager, FrameStore};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ── Helpers ────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingDisk {
    files: Mutex<Vec<(PathBuf, ContentHash)>>,
}

impl RecordingDisk {
    fn paths(&self) -> Vec<PathBuf> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }
}

impl DiskManager for RecordingDisk {
    fn created_file(&self, path: &Path, hash: &ContentHash) {
        self.files
            .lock()
            .unwrap()
            .push((path.to_path_buf(), hash.clone()));
    }
}

fn frame(n: i64) -> RationalTime {
    RationalTime::new(n, 24)
}

fn span(start: RationalTime, end: RationalTime) -> TimeRange {
    TimeRange::from_start_end(start, end)
}

fn rendered_frame(seed: u8) -> FrameBuffer {
    let params = VideoParams::new(8, 8, PixelFormat::Rgba8);
    let mut frame = FrameBuffer::new(params);
    frame.data_mut().fill(seed);
    frame
}

fn hash_of(frame: &FrameBuffer) -> ContentHash {
    // Stand-in for the renderer's real content hash.
    let mut bytes = vec![frame.data()[0]];
    bytes.extend_from_slice(&[0xca, 0xfe, 0x42]);
    ContentHash::new(bytes)
}

// ── Scenarios ──────────────────────────────────────────────────

#[test]
fn admitted_results_are_persisted_and_registered() {
    let tmp = tempfile::tempdir().unwrap();
    let disk = Arc::new(RecordingDisk::default());
    let store = FrameStore::new(tmp.path(), disk.clone());
    let cache = FrameHashCache::new(FrameRate::FPS_24.frame_duration());

    cache.register_job(span(frame(0), frame(10)), 1);

    let rendered = rendered_frame(0x40);
    let hash = hash_of(&rendered);

    assert!(cache.set_hash(frame(0), hash.clone(), 1));
    let path = store.save_frame(&hash, &rendered).unwrap();

    assert!(path.exists());
    assert_eq!(disk.paths(), vec![path]);
}

#[test]
fn stale_results_never_reach_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let disk = Arc::new(RecordingDisk::default());
    let store = FrameStore::new(tmp.path(), disk.clone());
    let cache = FrameHashCache::new(FrameRate::FPS_24.frame_duration());

    cache.register_job(span(frame(0), frame(10)), 1);
    cache.register_job(span(frame(0), frame(10)), 2);

    let rendered = rendered_frame(0x41);
    let hash = hash_of(&rendered);

    // The worker persists only when the cache admits its result.
    if cache.set_hash(frame(0), hash.clone(), 1) {
        store.save_frame(&hash, &rendered).unwrap();
    }

    assert!(disk.paths().is_empty());
}

#[test]
fn duplicate_content_is_encoded_once() {
    let tmp = tempfile::tempdir().unwrap();
    let disk = Arc::new(RecordingDisk::default());
    let store = FrameStore::new(tmp.path(), disk.clone());
    let cache = FrameHashCache::new(FrameRate::FPS_24.frame_duration());

    cache.register_job(span(frame(0), frame(10)), 1);

    let rendered = rendered_frame(0x42);
    let hash = hash_of(&rendered);

    for n in 0..3 {
        if cache.set_hash(frame(n), hash.clone(), 1) {
            // Frames already mapped to this hash share its file on disk.
            if cache.frames_with_hash(&hash).len() == 1 {
                store.save_frame(&hash, &rendered).unwrap();
            }
        }
    }

    assert_eq!(cache.frames_with_hash(&hash).len(), 3);
    assert_eq!(disk.paths().len(), 1);
}

#[test]
fn eviction_invalidates_then_rerender_resaves() {
    let tmp = tempfile::tempdir().unwrap();
    let disk = Arc::new(RecordingDisk::default());
    let store = FrameStore::new(tmp.path(), disk.clone());
    let cache = FrameHashCache::new(FrameRate::FPS_24.frame_duration());

    cache.register_job(span(frame(0), frame(10)), 1);

    let rendered = rendered_frame(0x43);
    let hash = hash_of(&rendered);
    cache.set_hash(frame(0), hash.clone(), 1);
    let path = store.save_frame(&hash, &rendered).unwrap();

    // The disk manager evicts the file; its in-memory references go too.
    std::fs::remove_file(&path).unwrap();
    let dropped = cache.take_frames_with_hash(&hash);
    assert_eq!(dropped, vec![frame(0)]);
    assert_eq!(cache.invalidated_frames(), vec![frame(0)]);

    // Re-render and re-save under a fresh job.
    cache.register_job(span(frame(0), frame(1)), 2);
    let rerendered = rendered_frame(0x44);
    let new_hash = hash_of(&rerendered);
    assert!(cache.set_hash(frame(0), new_hash.clone(), 2));
    let new_path = store.save_frame(&new_hash, &rerendered).unwrap();

    assert!(new_path.exists());
    assert!(cache.invalidated_frames().is_empty());
    assert_eq!(disk.paths().len(), 2);
}

#[test]
fn float_and_integer_content_live_in_separate_files() {
    let tmp = tempfile::tempdir().unwrap();
    let disk = Arc::new(RecordingDisk::default());
    let store = FrameStore::new(tmp.path(), disk.clone());

    let hash = ContentHash::from([0x77, 0x88, 0x99]);

    let int_frame = rendered_frame(0x10);
    let int_path = store.save_frame(&hash, &int_frame).unwrap();

    let params = VideoParams::new(8, 8, PixelFormat::Rgba32F);
    let samples = vec![1.5f32; 8 * 8 * 4];
    let float_frame = FrameBuffer::from_f32_pixels(params, &samples).unwrap();
    let float_path = store.save_frame(&hash, &float_frame).unwrap();

    assert_ne!(int_path, float_path);
    assert_eq!(int_path.extension().unwrap(), "jpg");
    assert_eq!(float_path.extension().unwrap(), "exr");
    assert_eq!(int_path.parent(), float_path.parent());
}
