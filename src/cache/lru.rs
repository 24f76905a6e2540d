//! LRU Tracker Module
//!
//! Recency order of cached keys and the eviction policy built on it.

use std::collections::VecDeque;

use crate::cache::{CacheKey, KeyPattern};

// == LRU Tracker ==
/// Tracks access order for LRU eviction.
///
/// Keys are stored in a VecDeque where:
/// - Front = Least recently used
/// - Back = Most recently used
///
/// Iterating front to back therefore walks from oldest to newest, and the
/// first key encountered is the one evicted.
#[derive(Debug, Default)]
pub struct LruTracker {
    order: VecDeque<CacheKey>,
}

impl LruTracker {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Touch ==
    /// Marks a key as most recently used, adding it if absent.
    pub fn touch(&mut self, key: &CacheKey) {
        self.remove(key);
        self.order.push_back(key.clone());
    }

    // == Remove ==
    pub fn remove(&mut self, key: &CacheKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }

    /// Drops every key matching `pattern`, returning the dropped keys in
    /// recency order.
    pub fn remove_matching(&mut self, pattern: &KeyPattern) -> Vec<CacheKey> {
        let mut removed = Vec::new();
        self.order.retain(|k| {
            if pattern.matches(k) {
                removed.push(k.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    // == Eviction Policy ==
    /// Pops the least recently used key if `len` has reached `capacity`.
    ///
    /// Ties cannot occur: the deque order is total, so the first key in
    /// iteration order is always the victim.
    pub fn evict_if_full(&mut self, len: usize, capacity: usize) -> Option<CacheKey> {
        if len >= capacity {
            self.order.pop_front()
        } else {
            None
        }
    }

    // == Peek Oldest ==
    pub fn oldest(&self) -> Option<&CacheKey> {
        self.order.front()
    }

    /// Keys from least to most recently used.
    pub fn iter(&self) -> impl Iterator<Item = &CacheKey> {
        self.order.iter()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.order.iter().any(|k| k == key)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> CacheKey {
        CacheKey::new("test").with(name)
    }

    fn order(lru: &LruTracker) -> Vec<String> {
        lru.iter().map(|k| k.parts()[0].clone()).collect()
    }

    #[test]
    fn test_lru_new() {
        let lru = LruTracker::new();
        assert!(lru.is_empty());
        assert_eq!(lru.len(), 0);
        assert!(lru.oldest().is_none());
    }

    #[test]
    fn test_lru_touch_existing_key_moves_to_back() {
        let mut lru = LruTracker::new();

        lru.touch(&key("a"));
        lru.touch(&key("b"));
        lru.touch(&key("c"));
        lru.touch(&key("a"));

        assert_eq!(lru.len(), 3);
        assert_eq!(order(&lru), ["b", "c", "a"]);
        assert_eq!(lru.oldest(), Some(&key("b")));
    }

    #[test]
    fn test_evict_if_full_below_capacity() {
        let mut lru = LruTracker::new();
        lru.touch(&key("a"));

        assert_eq!(lru.evict_if_full(1, 2), None);
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_evict_if_full_pops_oldest() {
        let mut lru = LruTracker::new();
        lru.touch(&key("a"));
        lru.touch(&key("b"));
        lru.touch(&key("a"));

        assert_eq!(lru.evict_if_full(2, 2), Some(key("b")));
        assert_eq!(order(&lru), ["a"]);
    }

    #[test]
    fn test_evict_if_full_empty() {
        let mut lru = LruTracker::new();
        assert_eq!(lru.evict_if_full(0, 0), None);
    }

    #[test]
    fn test_lru_remove() {
        let mut lru = LruTracker::new();
        lru.touch(&key("a"));
        lru.touch(&key("b"));
        lru.remove(&key("a"));
        lru.remove(&key("missing"));

        assert!(!lru.contains(&key("a")));
        assert!(lru.contains(&key("b")));
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_remove_matching_prefix() {
        let mut lru = LruTracker::new();
        lru.touch(&CacheKey::new("blockades").with("all"));
        lru.touch(&CacheKey::new("hospitals").with("all"));
        lru.touch(&CacheKey::new("blockades").with("1.000"));

        let removed = lru.remove_matching(&CacheKey::new("blockades").prefix());

        assert_eq!(removed.len(), 2);
        assert_eq!(lru.len(), 1);
        assert!(lru.contains(&CacheKey::new("hospitals").with("all")));
    }

    #[test]
    fn test_touch_same_key_repeatedly() {
        let mut lru = LruTracker::new();
        lru.touch(&key("a"));
        lru.touch(&key("a"));
        lru.touch(&key("a"));

        assert_eq!(lru.len(), 1);
    }
}
