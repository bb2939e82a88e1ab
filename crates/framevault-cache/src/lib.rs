//! FrameVault Cache - The time-to-hash index
//!
//! Maps quantized timeline positions to content hashes of rendered frames:
//! - Job claims and write admission for concurrent render workers
//! - Invalidation-range accounting across timeline edits
//! - Quantization of invalidated ranges to frame-aligned render times
//! - Validated/invalidated notifications delivered outside the lock

pub mod events;
pub mod index;
pub mod jobs;
pub mod quantize;

pub use events::{CacheEvent, CacheObserver, ChannelObserver};
pub use index::{FrameHashCache, TimelineListener};
pub use jobs::{JobClaim, JobTracker};
pub use quantize::frame_times;
