//! Read-Through Orchestrator
//!
//! Decides per call whether to serve a fresh entry, serve a stale entry and
//! revalidate in the background, join a fetch already in flight, or start a
//! new one.
//!
//! Every fetch runs on a spawned task owned by [`BackgroundTasks`], so it
//! settles and deregisters even if all callers awaiting it are dropped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::freshness::Freshness;
use crate::cache::inflight::{InFlightRegistry, SharedFetch};
use crate::cache::{CacheKey, CacheStats, EntryStore, KeyPattern};
use crate::config::CacheConfig;
use crate::error::FetchError;
use crate::tasks::BackgroundTasks;

/// Invoked with the new value when a background revalidation stores it.
pub type BackgroundCallback<V> = Arc<dyn Fn(&V) + Send + Sync>;

// == Fetch Options ==
/// Per-call options for [`SwrCache::cached_fetch`].
#[derive(Clone)]
pub struct FetchOptions<V> {
    ttl: Option<Duration>,
    force_refresh: bool,
    stale_while_revalidate: bool,
    on_background_complete: Option<BackgroundCallback<V>>,
}

impl<V> Default for FetchOptions<V> {
    fn default() -> Self {
        Self {
            ttl: None,
            force_refresh: false,
            stale_while_revalidate: true,
            on_background_complete: None,
        }
    }
}

impl<V> FetchOptions<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// TTL for the entry written on success. Defaults to the cache's TTL.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Skip fresh and stale entries and fetch.
    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    /// Serve stale entries while refreshing them. On by default.
    pub fn stale_while_revalidate(mut self, enabled: bool) -> Self {
        self.stale_while_revalidate = enabled;
        self
    }

    pub fn on_background_complete(mut self, callback: impl Fn(&V) + Send + Sync + 'static) -> Self {
        self.on_background_complete = Some(Arc::new(callback));
        self
    }
}

// == Fetched ==
/// Result of a read-through fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fetched<V> {
    pub data: V,
    /// Served from the store without waiting for a fetch
    pub from_cache: bool,
    /// Served from a stale entry; a refresh is running
    pub stale: bool,
}

impl<V> Fetched<V> {
    /// Transforms the data, keeping where it came from.
    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> Fetched<U> {
        Fetched {
            data: f(self.data),
            from_cache: self.from_cache,
            stale: self.stale,
        }
    }
}

// == Cache Status ==
/// Snapshot of one entry's freshness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub freshness: Freshness,
    pub fresh: bool,
    pub stale: bool,
    pub age_ms: u64,
    pub expires_in_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchMode {
    /// A caller is waiting on the result
    Foreground,
    /// Refreshing a stale entry that was already served
    Revalidate,
    /// Warming the cache ahead of use
    Preload,
}

struct Inner<V, E> {
    store: EntryStore<V>,
    in_flight: InFlightRegistry<V, E>,
    stats: CacheStats,
}

impl<V, E> Inner<V, E> {
    fn refresh_gauges(&mut self) {
        self.stats.set_total_entries(self.store.len());
        self.stats.set_in_flight(self.in_flight.len());
    }
}

// == SWR Cache ==
/// Stale-while-revalidate read-through cache.
///
/// Cloning is cheap; clones share the same store, registry and tasks.
pub struct SwrCache<V, E> {
    inner: Arc<Mutex<Inner<V, E>>>,
    clock: Arc<dyn Clock>,
    tasks: BackgroundTasks,
    default_ttl: Duration,
}

impl<V, E> Clone for SwrCache<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            clock: Arc::clone(&self.clock),
            tasks: self.tasks.clone(),
            default_ttl: self.default_ttl,
        }
    }
}

impl<V, E> SwrCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: std::error::Error + Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates an independent cache using the system clock.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                store: EntryStore::new(config.max_entries),
                in_flight: InFlightRegistry::new(),
                stats: CacheStats::new(),
            })),
            clock,
            tasks: BackgroundTasks::new(),
            default_ttl: config.default_ttl,
        }
    }

    // == Cached Fetch ==
    /// Reads `key` through the cache, calling `producer` only when needed.
    ///
    /// - Fresh entry: returned without I/O.
    /// - Stale entry with revalidation enabled: returned immediately while a
    ///   background refresh runs (at most one per key). Refresh failures are
    ///   logged and never reach the caller.
    /// - Otherwise joins the fetch in flight for `key`, or starts one, and
    ///   propagates the producer's failure unchanged.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn cached_fetch<F, Fut>(
        &self,
        key: &CacheKey,
        producer: F,
        options: FetchOptions<V>,
    ) -> Result<Fetched<V>, FetchError<E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let FetchOptions {
            ttl,
            force_refresh,
            stale_while_revalidate,
            on_background_complete,
        } = options;
        let ttl = ttl.unwrap_or(self.default_ttl);
        let now = self.clock.now_ms();

        let pending = {
            let mut inner = self.inner.lock();
            let cached = inner
                .store
                .get(key)
                .map(|entry| (entry.freshness(now), entry.data().clone()));

            match cached {
                Some((Freshness::Fresh, data)) if !force_refresh => {
                    inner.stats.record_hit();
                    debug!(key = %key, "Cache hit");
                    return Ok(Fetched {
                        data,
                        from_cache: true,
                        stale: false,
                    });
                }
                Some((Freshness::Stale, data)) if stale_while_revalidate && !force_refresh => {
                    inner.stats.record_stale_hit();
                    if !inner.in_flight.contains(key) {
                        debug!(key = %key, "Serving stale entry, revalidating in background");
                        self.start_fetch(
                            &mut inner,
                            key,
                            producer,
                            ttl,
                            FetchMode::Revalidate,
                            on_background_complete,
                        );
                    }
                    return Ok(Fetched {
                        data,
                        from_cache: true,
                        stale: true,
                    });
                }
                _ => {}
            }

            let joined = inner.in_flight.get(key);
            match joined {
                Some(fetch) => {
                    inner.stats.record_deduplicated();
                    debug!(key = %key, "Joining in-flight fetch");
                    fetch
                }
                None => {
                    inner.stats.record_miss();
                    debug!(key = %key, force_refresh, "Cache miss, fetching");
                    self.start_fetch(&mut inner, key, producer, ttl, FetchMode::Foreground, None)
                }
            }
        };

        let data = pending.await?;
        Ok(Fetched {
            data,
            from_cache: false,
            stale: false,
        })
    }

    // == Preload ==
    /// Starts a fetch for `key` unless it is fresh or already in flight.
    ///
    /// Fire-and-forget: failures are logged and swallowed. Returns whether a
    /// fetch was started. Must be called from within a tokio runtime.
    pub fn preload<F, Fut>(&self, key: CacheKey, producer: F, ttl: Option<Duration>) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();

        let fresh = inner
            .store
            .peek(&key)
            .is_some_and(|entry| entry.freshness(now) == Freshness::Fresh);
        if fresh || inner.in_flight.contains(&key) {
            debug!(key = %key, fresh, "Skipping preload");
            return false;
        }

        let ttl = ttl.unwrap_or(self.default_ttl);
        self.start_fetch(&mut inner, &key, producer, ttl, FetchMode::Preload, None);
        true
    }

    // == Direct Access ==
    /// Returns the cached value if it is still usable, marking it recently
    /// used. Never fetches.
    pub fn get_cached(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();
        inner
            .store
            .get(key)
            .filter(|entry| entry.freshness(now).is_usable())
            .map(|entry| entry.data().clone())
    }

    /// Stores a value directly, e.g. to merge a realtime update.
    pub fn set_cached(&self, key: CacheKey, value: V, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();
        if let Some(evicted) = inner.store.set(key, value, ttl, now) {
            inner.stats.record_eviction();
            debug!(key = %evicted, "Evicted least recently used entry");
        }
        inner.refresh_gauges();
    }

    /// Freshness snapshot for `key` without touching recency.
    pub fn status(&self, key: &CacheKey) -> Option<CacheStatus> {
        let now = self.clock.now_ms();
        let inner = self.inner.lock();
        inner.store.peek(key).map(|entry| {
            let freshness = entry.freshness(now);
            CacheStatus {
                freshness,
                fresh: freshness == Freshness::Fresh,
                stale: freshness == Freshness::Stale,
                age_ms: entry.age_ms(now),
                expires_in_ms: entry.ttl_remaining_ms(now),
            }
        })
    }

    // == Invalidation ==
    /// Removes the entries selected by `pattern` so the next read fetches.
    ///
    /// Fetches already in flight are left running.
    pub fn invalidate(&self, pattern: &KeyPattern) -> usize {
        let mut inner = self.inner.lock();
        let removed = inner.store.delete_matching(pattern);
        inner.refresh_gauges();
        debug!(pattern = %pattern, removed, "Invalidated cache entries");
        removed
    }

    /// Empties the store and cancels background refreshes and preloads.
    ///
    /// Fetches a caller is waiting on keep running and resolve for their
    /// callers, but nothing started before the clear repopulates the store.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        self.tasks.cancel_all();
        inner.store.clear();
        inner.in_flight.clear();
        inner.refresh_gauges();
        info!("Cache cleared");
    }

    // == Introspection ==
    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        self.inner.lock().in_flight.contains(key)
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().store.is_empty()
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Lifecycle ==
    /// Waits for all outstanding fetches to settle.
    pub async fn drain(&self) {
        self.tasks.drain().await;
    }

    /// Cancels outstanding fetches and waits for them to unwind.
    pub async fn shutdown(&self) {
        self.tasks.shutdown().await;
        info!("Cache background work stopped");
    }

    /// Spawns and registers a fetch. Called with the state lock held, so the
    /// task cannot settle before it is registered.
    fn start_fetch<F, Fut>(
        &self,
        inner: &mut Inner<V, E>,
        key: &CacheKey,
        producer: F,
        ttl: Duration,
        mode: FetchMode,
        on_complete: Option<BackgroundCallback<V>>,
    ) -> SharedFetch<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let generation = inner.in_flight.next_generation();
        let task = FetchTask {
            shared: Arc::clone(&self.inner),
            clock: Arc::clone(&self.clock),
            key: key.clone(),
            generation,
            ttl,
            mode,
        };
        let run = task.run(producer, on_complete);
        let handle = match mode {
            FetchMode::Foreground => self.tasks.spawn_foreground(run),
            FetchMode::Revalidate | FetchMode::Preload => self.tasks.spawn(run),
        };

        let task_key = key.to_string();
        let fetch = async move {
            match handle.await {
                Ok(Some(outcome)) => outcome,
                Ok(None) => Err(FetchError::Cancelled(task_key)),
                Err(err) => Err(FetchError::TaskFailed {
                    key: task_key,
                    reason: err.to_string(),
                }),
            }
        }
        .boxed()
        .shared();

        inner.in_flight.register(key.clone(), generation, fetch.clone());
        inner.refresh_gauges();
        fetch
    }
}

// == Fetch Task ==
/// One registered fetch. Dropping it deregisters it, which covers
/// cancellation and panics.
struct FetchTask<V, E> {
    shared: Arc<Mutex<Inner<V, E>>>,
    clock: Arc<dyn Clock>,
    key: CacheKey,
    generation: u64,
    ttl: Duration,
    mode: FetchMode,
}

impl<V, E> FetchTask<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: std::error::Error + Clone + Send + Sync + 'static,
{
    async fn run<F, Fut>(
        self,
        producer: F,
        on_complete: Option<BackgroundCallback<V>>,
    ) -> Result<V, FetchError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let outcome = producer().await;
        let background = self.mode != FetchMode::Foreground;

        let written = {
            let mut inner = self.shared.lock();
            // Only the operation still registered for the key may write.
            let current = inner.in_flight.settle(&self.key, self.generation);
            let written = match &outcome {
                Ok(data) if current => {
                    let now = self.clock.now_ms();
                    if let Some(evicted) = inner.store.set(self.key.clone(), data.clone(), self.ttl, now) {
                        inner.stats.record_eviction();
                        debug!(key = %evicted, "Evicted least recently used entry");
                    }
                    if background {
                        inner.stats.record_background_refresh();
                    }
                    true
                }
                Ok(_) => false,
                Err(_) => {
                    if background {
                        inner.stats.record_background_failure();
                    }
                    false
                }
            };
            inner.refresh_gauges();
            written
        };

        match (&outcome, self.mode) {
            (Ok(data), _) if written => {
                debug!(key = %self.key, mode = ?self.mode, "Stored fetched value");
                if let Some(callback) = on_complete {
                    callback(data);
                }
            }
            (Ok(_), _) => debug!(key = %self.key, "Discarding result of superseded fetch"),
            (Err(err), FetchMode::Foreground) => debug!(key = %self.key, error = %err, "Fetch failed"),
            (Err(err), FetchMode::Revalidate) => {
                warn!(key = %self.key, error = %err, "Background refresh failed")
            }
            (Err(err), FetchMode::Preload) => warn!(key = %self.key, error = %err, "Preload failed"),
        }

        outcome.map_err(FetchError::Producer)
    }
}

impl<V, E> Drop for FetchTask<V, E> {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        if inner.in_flight.settle(&self.key, self.generation) {
            debug!(key = %self.key, "Fetch dropped before settling");
        }
        inner.refresh_gauges();
    }
}
