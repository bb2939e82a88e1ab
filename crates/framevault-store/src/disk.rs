//! Seam to the external disk-space manager.

use framevault_core::ContentHash;
use std::path::Path;

/// Tracks files the cache creates on disk.
///
/// Quota and eviction policy live behind this trait, outside the cache;
/// the store only reports, it never queries back.
pub trait DiskManager: Send + Sync {
    /// A frame file for `hash` was written at `path`.
    fn created_file(&self, path: &Path, hash: &ContentHash);
}

/// Disk manager that tracks nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiskManager;

impl DiskManager for NullDiskManager {
    fn created_file(&self, _path: &Path, _hash: &ContentHash) {}
}
