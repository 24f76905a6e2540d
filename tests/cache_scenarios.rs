//! End-to-end cache behaviour through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use kalinga_cache::{
    cache::{CacheKey, KeyPattern, MockClock},
    client::ApiError,
    CacheConfig, FetchOptions, SwrCache,
};
use tokio_test::{assert_ready, task};

type TestCache = SwrCache<String, ApiError>;

fn cache_with_clock(max_entries: usize) -> (TestCache, MockClock) {
    let clock = MockClock::new(0);
    let config = CacheConfig {
        max_entries,
        default_ttl: Duration::from_secs(10),
    };
    (SwrCache::with_clock(&config, Arc::new(clock.clone())), clock)
}

fn key(namespace: &str, part: &str) -> CacheKey {
    CacheKey::new(namespace).with(part)
}

#[tokio::test]
async fn test_concurrent_cold_reads_share_one_producer() {
    let (cache, _clock) = cache_with_clock(10);
    let calls = Arc::new(AtomicUsize::new(0));
    let k = key("hospitals", "all");

    let reads = (0..8).map(|_| {
        let calls = Arc::clone(&calls);
        cache.cached_fetch(
            &k,
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok("list".to_string())
            },
            FetchOptions::new(),
        )
    });
    let results = join_all(reads).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(results
        .iter()
        .all(|r| matches!(r, Ok(fetched) if fetched.data == "list")));
}

#[tokio::test]
async fn test_stale_read_resolves_on_first_poll() {
    let (cache, clock) = cache_with_clock(10);
    let k = key("incidents", "active");
    cache.set_cached(k.clone(), "old".to_string(), None);
    clock.advance(Duration::from_secs(15));

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let mut read = task::spawn(cache.cached_fetch(
        &k,
        move || async move {
            let _ = rx.await;
            Ok("new".to_string())
        },
        FetchOptions::new(),
    ));
    let fetched = assert_ready!(read.poll()).unwrap();

    assert_eq!(fetched.data, "old");
    assert!(fetched.stale);
    assert_eq!(cache.get_cached(&k).as_deref(), Some("old"));

    tx.send(()).unwrap();
    cache.drain().await;
    assert_eq!(cache.get_cached(&k).as_deref(), Some("new"));
}

#[tokio::test]
async fn test_failed_revalidation_keeps_old_entry() {
    let (cache, clock) = cache_with_clock(10);
    let k = key("chat", "conversations");
    cache.set_cached(k.clone(), "old".to_string(), None);
    clock.advance(Duration::from_secs(11));

    let fetched = cache
        .cached_fetch(
            &k,
            || async { Err(ApiError::Network("offline".to_string())) },
            FetchOptions::new(),
        )
        .await
        .unwrap();
    cache.drain().await;

    assert_eq!(fetched.data, "old");
    assert_eq!(cache.get_cached(&k).as_deref(), Some("old"));
    assert_eq!(cache.stats().background_failures, 1);
}

#[tokio::test]
async fn test_invalidated_namespace_reads_cold() {
    let (cache, _clock) = cache_with_clock(10);
    cache.set_cached(key("blockades", "all"), "a".to_string(), None);
    cache.set_cached(key("blockades", "14.654"), "b".to_string(), None);
    cache.set_cached(key("hospitals", "all"), "c".to_string(), None);

    let removed = cache.invalidate(&"blockades:*".parse::<KeyPattern>().unwrap());
    assert_eq!(removed, 2);

    let fetched = cache
        .cached_fetch(
            &key("blockades", "all"),
            || async { Ok("fetched".to_string()) },
            FetchOptions::new(),
        )
        .await
        .unwrap();
    assert!(!fetched.from_cache);
    assert!(cache.get_cached(&key("hospitals", "all")).is_some());
}

#[tokio::test]
async fn test_lru_keeps_recently_touched_keys() {
    let (cache, _clock) = cache_with_clock(3);
    for part in ["a", "b", "c"] {
        cache.set_cached(key("k", part), part.to_string(), None);
    }
    // Touch "a" so "b" becomes the oldest
    assert!(cache.get_cached(&key("k", "a")).is_some());

    cache.set_cached(key("k", "d"), "d".to_string(), None);

    assert_eq!(cache.len(), 3);
    assert!(cache.get_cached(&key("k", "b")).is_none());
    assert!(cache.get_cached(&key("k", "a")).is_some());
    assert_eq!(cache.stats().evictions, 1);
}

#[tokio::test]
async fn test_instances_are_independent() {
    let (first, _) = cache_with_clock(10);
    let (second, _) = cache_with_clock(10);

    first.set_cached(key("hospitals", "all"), "x".to_string(), None);

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
}

#[tokio::test]
async fn test_shutdown_cancels_pending_fetch() {
    let (cache, _clock) = cache_with_clock(10);
    let k = key("transfers", "1");

    let started = cache.preload(
        k.clone(),
        || async {
            std::future::pending::<()>().await;
            Ok("never".to_string())
        },
        None,
    );
    assert!(started);

    cache.shutdown().await;

    assert!(!cache.is_in_flight(&k));
    assert!(cache.get_cached(&k).is_none());
}
