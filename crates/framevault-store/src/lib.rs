//! FrameVault Store - Disk persistence for rendered frames
//!
//! Writes pixel buffers to a content-addressed cache layout:
//! - Deterministic sharded path derivation from content hashes
//! - JPEG encoding for integer pixel formats
//! - OpenEXR encoding for float pixel formats
//! - Registration of new files with the external disk-space manager

pub mod disk;
pub mod store;

pub use disk::{DiskManager, NullDiskManager};
pub use store::{cache_path, format_extension, FrameStore};
