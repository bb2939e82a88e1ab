//! Integration test crate for FrameVault.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on the cache and store crates to verify the full
//! render → admit → persist → invalidate → re-render loop.

#[cfg(test)]
mod cache;

#[cfg(test)]
mod store;
