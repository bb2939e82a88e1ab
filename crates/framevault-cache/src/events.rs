//! Cache change notifications.

use crossbeam_channel::{unbounded, Receiver, Sender};
use framevault_core::TimeRange;
use std::sync::Arc;

/// A change to the set of currently cached frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    /// The range now has a current cached result.
    Validated(TimeRange),
    /// Cached results in the range are stale and must be re-rendered.
    Invalidated(TimeRange),
}

/// Receives cache events.
///
/// Invoked strictly after the cache has released its internal lock, so
/// implementations may call back into the cache.
pub trait CacheObserver: Send + Sync {
    fn cache_event(&self, event: CacheEvent);
}

/// Observer that forwards events into a crossbeam channel, for owners that
/// prefer draining a message stream over callbacks.
pub struct ChannelObserver {
    tx: Sender<CacheEvent>,
}

impl ChannelObserver {
    /// Create the observer and the receiving end of its channel.
    pub fn new() -> (Arc<Self>, Receiver<CacheEvent>) {
        let (tx, rx) = unbounded();
        (Arc::new(Self { tx }), rx)
    }
}

impl CacheObserver for ChannelObserver {
    fn cache_event(&self, event: CacheEvent) {
        // A dropped receiver just stops listening; events are advisory.
        let _ = self.tx.send(event);
    }
}
