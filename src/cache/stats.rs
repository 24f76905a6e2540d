//! Cache Statistics Module
//!
//! Counters describing how reads were served and what background work did.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads served from a fresh entry
    pub hits: u64,
    /// Reads served from a stale entry while revalidating
    pub stale_hits: u64,
    /// Reads that had to start a fetch (cold, expired or forced)
    pub misses: u64,
    /// Reads that joined an operation already in flight
    pub deduplicated: u64,
    /// Entries evicted due to LRU policy
    pub evictions: u64,
    /// Background refreshes and preloads that wrote through
    pub background_refreshes: u64,
    /// Background refreshes and preloads that failed
    pub background_failures: u64,
    /// Current number of entries in the store
    pub total_entries: usize,
    /// Current number of registered in-flight operations
    pub in_flight: usize,
}

impl CacheStats {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Share of lookups answered from cache, fresh or stale.
    ///
    /// Returns 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.stale_hits;
        let total = served + self.misses + self.deduplicated;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_stale_hit(&mut self) {
        self.stale_hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_deduplicated(&mut self) {
        self.deduplicated += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_background_refresh(&mut self) {
        self.background_refreshes += 1;
    }

    pub fn record_background_failure(&mut self) {
        self.background_failures += 1;
    }

    // == Update Gauges ==
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }

    pub fn set_in_flight(&mut self, count: usize) {
        self.in_flight = count;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats, CacheStats::default());
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheStats::new().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_counts_stale_hits() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_stale_hit();
        stats.record_miss();
        stats.record_deduplicated();
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_hit_rate_all_misses() {
        let mut stats = CacheStats::new();
        stats.record_miss();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_background_counters() {
        let mut stats = CacheStats::new();
        stats.record_background_refresh();
        stats.record_background_failure();
        stats.record_background_failure();
        stats.record_eviction();

        assert_eq!(stats.background_refreshes, 1);
        assert_eq!(stats.background_failures, 2);
        assert_eq!(stats.evictions, 1);
    }

    #[test]
    fn test_gauges() {
        let mut stats = CacheStats::new();
        stats.set_total_entries(42);
        stats.set_in_flight(3);
        assert_eq!(stats.total_entries, 42);
        assert_eq!(stats.in_flight, 3);
    }
}
