//! Cache Store Module
//!
//! Bounded key/entry storage combining a HashMap with LRU tracking.
//! Expiry is never enforced here; callers classify entries through the
//! freshness policy.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::{CacheEntry, CacheKey, KeyPattern, LruTracker};

// == Entry Store ==
/// Bounded store that evicts the least recently used entry on insert.
#[derive(Debug)]
pub struct EntryStore<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    lru: LruTracker,
    max_entries: usize,
}

impl<V> EntryStore<V> {
    // == Constructor ==
    /// Creates an empty store holding at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            max_entries,
        }
    }

    // == Get ==
    /// Looks up an entry and marks it most recently used.
    pub fn get(&mut self, key: &CacheKey) -> Option<&CacheEntry<V>> {
        if self.entries.contains_key(key) {
            self.lru.touch(key);
        }
        self.entries.get(key)
    }

    /// Looks up an entry without changing recency.
    pub fn peek(&self, key: &CacheKey) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// Inserting a new key into a full store first evicts the least recently
    /// used entry, whose key is returned. Overwriting never evicts.
    pub fn set(&mut self, key: CacheKey, value: V, ttl: Duration, now_ms: u64) -> Option<CacheKey> {
        let evicted = if self.entries.contains_key(&key) {
            None
        } else {
            self.lru.evict_if_full(self.entries.len(), self.max_entries)
        };
        if let Some(oldest) = &evicted {
            self.entries.remove(oldest);
        }

        self.lru.touch(&key);
        self.entries.insert(key, CacheEntry::new(value, now_ms, ttl));

        evicted
    }

    // == Delete ==
    /// Removes a single key, returning whether it was present.
    pub fn delete(&mut self, key: &CacheKey) -> bool {
        if self.entries.remove(key).is_some() {
            self.lru.remove(key);
            true
        } else {
            false
        }
    }

    /// Removes every key matching `pattern`, returning how many were removed.
    pub fn delete_matching(&mut self, pattern: &KeyPattern) -> usize {
        match pattern {
            KeyPattern::Exact(key) => usize::from(self.delete(key)),
            KeyPattern::Prefix(_) => {
                let removed = self.lru.remove_matching(pattern);
                for key in &removed {
                    self.entries.remove(key);
                }
                removed.len()
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.lru.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }
}
