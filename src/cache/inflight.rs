//! In-Flight Request Registry
//!
//! At most one pending fetch per key. Callers that arrive while a fetch is
//! running clone its shared future instead of starting another.

use std::collections::HashMap;

use futures::future::{BoxFuture, Shared};

use crate::cache::CacheKey;
use crate::error::FetchError;

/// A fetch that any number of callers can await.
pub type SharedFetch<V, E> = Shared<BoxFuture<'static, Result<V, FetchError<E>>>>;

struct Pending<V, E> {
    generation: u64,
    fetch: SharedFetch<V, E>,
}

// == In-Flight Registry ==
/// Tracks pending fetches by key.
///
/// Every registration carries a generation number. Settling only removes the
/// slot if it still holds the same generation, so an operation orphaned by
/// `clear()` can never deregister its replacement.
pub struct InFlightRegistry<V, E> {
    pending: HashMap<CacheKey, Pending<V, E>>,
    next_generation: u64,
}

impl<V, E> InFlightRegistry<V, E> {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Allocates the generation for the next registration.
    pub fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Registers a fetch, replacing nothing: callers check `contains` first.
    pub fn register(&mut self, key: CacheKey, generation: u64, fetch: SharedFetch<V, E>) {
        debug_assert!(!self.pending.contains_key(&key), "duplicate in-flight fetch");
        self.pending.insert(key, Pending { generation, fetch });
    }

    /// Clones the shared future registered for `key`.
    pub fn get(&self, key: &CacheKey) -> Option<SharedFetch<V, E>> {
        self.pending.get(key).map(|p| p.fetch.clone())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.pending.contains_key(key)
    }

    /// True if `generation` is still the registered operation for `key`.
    pub fn is_current(&self, key: &CacheKey, generation: u64) -> bool {
        self.pending
            .get(key)
            .is_some_and(|p| p.generation == generation)
    }

    /// Deregisters the operation if it is still current.
    ///
    /// Returns whether it was current, i.e. whether its result may be
    /// written through.
    pub fn settle(&mut self, key: &CacheKey, generation: u64) -> bool {
        if self.is_current(key, generation) {
            self.pending.remove(key);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<V, E> Default for InFlightRegistry<V, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    type Registry = InFlightRegistry<u32, String>;

    fn ready(value: u32) -> SharedFetch<u32, String> {
        futures::future::ready(Ok(value)).boxed().shared()
    }

    fn key() -> CacheKey {
        CacheKey::new("h").with(1)
    }

    #[test]
    fn test_generations_increase() {
        let mut registry = Registry::new();
        let a = registry.next_generation();
        let b = registry.next_generation();
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_register_and_join() {
        let mut registry = Registry::new();
        let generation = registry.next_generation();
        registry.register(key(), generation, ready(7));

        assert!(registry.contains(&key()));
        let joined = registry.get(&key()).unwrap();
        assert_eq!(joined.await.unwrap(), 7);
    }

    #[test]
    fn test_settle_removes_current() {
        let mut registry = Registry::new();
        let generation = registry.next_generation();
        registry.register(key(), generation, ready(1));

        assert!(registry.settle(&key(), generation));
        assert!(registry.is_empty());
        // Settling twice is harmless
        assert!(!registry.settle(&key(), generation));
    }

    #[test]
    fn test_stale_generation_cannot_deregister_replacement() {
        let mut registry = Registry::new();
        let old = registry.next_generation();
        registry.register(key(), old, ready(1));

        registry.clear();
        let new = registry.next_generation();
        registry.register(key(), new, ready(2));

        assert!(!registry.settle(&key(), old));
        assert!(registry.is_current(&key(), new));
        assert_eq!(registry.len(), 1);
    }
}
