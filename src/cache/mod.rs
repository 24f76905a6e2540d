//! Cache Module
//!
//! Stale-while-revalidate read-through cache with request deduplication,
//! TTL freshness windows and LRU eviction.

mod clock;
mod entry;
mod freshness;
mod inflight;
mod key;
mod lru;
mod stats;
mod store;
mod swr;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{duration_ms, Clock, MockClock, SystemClock};
pub use entry::CacheEntry;
pub use freshness::{
    classify, is_fresh, is_stale_but_usable, usable_until, Freshness, STALE_GRACE_MULTIPLIER,
};
pub use inflight::{InFlightRegistry, SharedFetch};
pub use key::{CacheKey, KeyPattern, KEY_SEPARATOR, WILDCARD};
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::EntryStore;
pub use swr::{BackgroundCallback, CacheStatus, FetchOptions, Fetched, SwrCache};

use std::time::Duration;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Entries kept before the least recently used one is evicted
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Freshness window for entries written without an explicit TTL
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);
