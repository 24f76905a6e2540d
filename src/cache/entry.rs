//! Cache Entry Module
//!
//! Defines the immutable record stored for each cached key.

use std::time::Duration;

use crate::cache::clock::duration_ms;
use crate::cache::freshness::{self, Freshness};

// == Cache Entry ==
/// A cached value with its creation and expiry timestamps.
///
/// Entries are never mutated; refreshing a key stores a new entry.
/// Invariant: `expires_at >= created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    data: V,
    /// Creation timestamp (Unix milliseconds)
    created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    expires_at: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry created at `now_ms` that stays fresh for `ttl`.
    pub fn new(data: V, now_ms: u64, ttl: Duration) -> Self {
        Self {
            data,
            created_at: now_ms,
            expires_at: now_ms.saturating_add(duration_ms(ttl)),
        }
    }

    pub fn data(&self) -> &V {
        &self.data
    }

    pub fn into_data(self) -> V {
        self.data
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }

    /// The TTL the entry was created with, in milliseconds.
    pub fn ttl_ms(&self) -> u64 {
        self.expires_at - self.created_at
    }

    /// Milliseconds since creation, zero if the clock went backwards.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created_at)
    }

    /// Milliseconds until the entry stops being fresh, zero once stale.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at.saturating_sub(now_ms)
    }

    // == Freshness ==
    pub fn freshness(&self, now_ms: u64) -> Freshness {
        freshness::classify(self, now_ms)
    }
}
