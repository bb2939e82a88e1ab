//! Content hashes identifying rendered frame pixels.
//!
//! Equal hashes imply interchangeable pixel content, which is what lets
//! the cache dedup identical frames and address files by content on disk.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;

/// Opaque content identifier for a rendered frame.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash(Vec<u8>);

impl ContentHash {
    /// Create a hash from raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The raw hash bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes in the hash.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero-length hash.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowercase hex rendering of the full hash.
    pub fn to_hex(&self) -> String {
        hex_of(&self.0)
    }
}

impl From<Vec<u8>> for ContentHash {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ContentHash {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for ContentHash {
    fn from(bytes: [u8; N]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Lowercase hex rendering of arbitrary bytes.
pub fn hex_of(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // Writing to a String cannot fail
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
