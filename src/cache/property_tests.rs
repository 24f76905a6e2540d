//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store, freshness and key invariants against
//! simple models.

use proptest::prelude::*;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use crate::cache::{
    classify, CacheEntry, CacheKey, EntryStore, Freshness, KeyPattern, STALE_GRACE_MULTIPLIER,
};

// == Test Configuration ==
const TEST_TTL: Duration = Duration::from_millis(1_000);

// == Strategies ==
/// Generates keys from a small space so operations collide often
fn key_strategy() -> impl Strategy<Value = CacheKey> {
    (prop::sample::select(vec!["hospitals", "blockades", "transfers"]), 0u32..8)
        .prop_map(|(namespace, id)| CacheKey::new(namespace).with(id))
}

fn segment_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_.-]{1,12}"
}

#[derive(Debug, Clone)]
enum StoreOp {
    Set { key: CacheKey, value: u32 },
    Get { key: CacheKey },
    Delete { key: CacheKey },
}

fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        (key_strategy(), any::<u32>()).prop_map(|(key, value)| StoreOp::Set { key, value }),
        key_strategy().prop_map(|key| StoreOp::Get { key }),
        key_strategy().prop_map(|key| StoreOp::Delete { key }),
    ]
}

/// Reference LRU: front is least recently used.
struct ModelLru {
    order: VecDeque<(CacheKey, u32)>,
    capacity: usize,
}

impl ModelLru {
    fn position(&self, key: &CacheKey) -> Option<usize> {
        self.order.iter().position(|(k, _)| k == key)
    }

    fn get(&mut self, key: &CacheKey) -> Option<u32> {
        let index = self.position(key)?;
        let item = self.order.remove(index)?;
        let value = item.1;
        self.order.push_back(item);
        Some(value)
    }

    fn set(&mut self, key: CacheKey, value: u32) {
        match self.position(&key) {
            Some(index) => {
                self.order.remove(index);
            }
            None if self.order.len() >= self.capacity => {
                self.order.pop_front();
            }
            None => {}
        }
        self.order.push_back((key, value));
    }

    fn delete(&mut self, key: &CacheKey) {
        if let Some(index) = self.position(key) {
            self.order.remove(index);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // The store agrees with a reference LRU model for any operation sequence.
    #[test]
    fn prop_store_matches_lru_model(
        capacity in 1usize..6,
        ops in prop::collection::vec(store_op_strategy(), 1..80)
    ) {
        let mut store = EntryStore::new(capacity);
        let mut model = ModelLru { order: VecDeque::new(), capacity };

        for op in ops {
            match op {
                StoreOp::Set { key, value } => {
                    store.set(key.clone(), value, TEST_TTL, 0);
                    model.set(key, value);
                }
                StoreOp::Get { key } => {
                    let actual = store.get(&key).map(|e| *e.data());
                    prop_assert_eq!(actual, model.get(&key), "Value mismatch for {}", key);
                }
                StoreOp::Delete { key } => {
                    store.delete(&key);
                    model.delete(&key);
                }
            }
            prop_assert_eq!(store.len(), model.order.len());
        }

        let expected: Vec<&CacheKey> = model.order.iter().map(|(k, _)| k).collect();
        let actual: Vec<&CacheKey> = store.keys().collect();
        prop_assert_eq!(actual, expected, "Recency order mismatch");
    }

    // Writing N + k distinct keys leaves exactly the last N.
    #[test]
    fn prop_capacity_keeps_most_recent(capacity in 1usize..20, extra in 0usize..20) {
        let mut store = EntryStore::new(capacity);
        let total = capacity + extra;

        for id in 0..total {
            store.set(CacheKey::new("k").with(id), id, TEST_TTL, 0);
            prop_assert!(store.len() <= capacity, "Store size {} exceeds {}", store.len(), capacity);
        }

        for id in 0..total {
            let present = store.peek(&CacheKey::new("k").with(id)).is_some();
            prop_assert_eq!(present, id >= extra, "Unexpected presence for id {}", id);
        }
    }

    // Overwriting a key at capacity never evicts another entry.
    #[test]
    fn prop_overwrite_never_evicts(capacity in 1usize..10, rewrites in prop::collection::vec(0usize..10, 1..30)) {
        let mut store = EntryStore::new(capacity);
        for id in 0..capacity {
            store.set(CacheKey::new("k").with(id), 0u32, TEST_TTL, 0);
        }

        for (round, id) in rewrites.into_iter().enumerate() {
            let id = id % capacity;
            let evicted = store.set(CacheKey::new("k").with(id), round as u32, TEST_TTL, 0);
            prop_assert!(evicted.is_none());
            prop_assert_eq!(store.len(), capacity);
        }
    }

    // Fresh, stale and expired partition the timeline in that order.
    #[test]
    fn prop_freshness_windows(created_at in 0u64..1_000_000, ttl_ms in 1u64..100_000, offset in 0u64..1_000_000) {
        let entry = CacheEntry::new((), created_at, Duration::from_millis(ttl_ms));
        let now = created_at + offset;

        let expected = if offset < ttl_ms {
            Freshness::Fresh
        } else if offset < ttl_ms * STALE_GRACE_MULTIPLIER {
            Freshness::Stale
        } else {
            Freshness::Expired
        };
        prop_assert_eq!(classify(&entry, now), expected);
    }

    // Freshness never improves as time passes.
    #[test]
    fn prop_freshness_is_monotonic(ttl_ms in 1u64..10_000, a in 0u64..100_000, b in 0u64..100_000) {
        let entry = CacheEntry::new((), 0, Duration::from_millis(ttl_ms));
        let (earlier, later) = if a <= b { (a, b) } else { (b, a) };

        let rank = |f: Freshness| match f {
            Freshness::Fresh => 0,
            Freshness::Stale => 1,
            Freshness::Expired => 2,
        };
        prop_assert!(rank(classify(&entry, earlier)) <= rank(classify(&entry, later)));
    }

    // Rendering a key and parsing it back yields the same key.
    #[test]
    fn prop_key_text_form_is_stable(
        namespace in "[a-z]{1,10}",
        parts in prop::collection::vec(segment_strategy(), 0..4)
    ) {
        let key = parts.iter().fold(CacheKey::new(namespace), |key, part| key.with(part));
        let parsed: CacheKey = key.to_string().parse().unwrap();
        prop_assert_eq!(parsed, key);
    }

    // A prefix pattern selects exactly the keys that extend it segment-wise.
    #[test]
    fn prop_prefix_pattern_is_segment_wise(
        keys in prop::collection::hash_set(key_strategy(), 1..20),
        prefix in key_strategy()
    ) {
        let pattern = prefix.prefix();
        let mut store = EntryStore::new(64);
        for key in &keys {
            store.set(key.clone(), 0u32, TEST_TTL, 0);
        }

        let expected: HashSet<&CacheKey> = keys.iter().filter(|k| k.starts_with(&prefix)).collect();
        let removed = store.delete_matching(&pattern);

        prop_assert_eq!(removed, expected.len());
        for key in &keys {
            prop_assert_eq!(store.peek(key).is_none(), expected.contains(key));
        }
        // Exact patterns never reach neighbouring ids like k:1 vs k:10
        let exact = KeyPattern::Exact(prefix.clone());
        prop_assert!(keys.iter().filter(|k| exact.matches(k)).count() <= 1);
    }
}

// == Property Test for Error Response Format ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Every error response carries a JSON body with a string "error" field.
    #[test]
    fn prop_error_response_format(error_msg in "[a-zA-Z0-9 _-]{1,100}") {
        use crate::error::CacheError;
        use axum::body::to_bytes;
        use axum::response::IntoResponse;

        let error_variants = vec![
            CacheError::NotFound(error_msg.clone()),
            CacheError::InvalidKey(error_msg.clone()),
            CacheError::InvalidRequest(error_msg.clone()),
            CacheError::Upstream { status: Some(500), message: error_msg.clone() },
            CacheError::Unavailable(error_msg.clone()),
            CacheError::Internal(error_msg.clone()),
        ];

        let rt = tokio::runtime::Runtime::new().unwrap();
        for error in error_variants {
            let expected_msg = error.to_string();
            let response = error.into_response();

            let content_type = response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok());
            prop_assert!(content_type.map(|ct| ct.contains("application/json")).unwrap_or(false));

            let bytes = rt.block_on(async { to_bytes(response.into_body(), usize::MAX).await.unwrap() });
            let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

            prop_assert_eq!(json["error"].as_str(), Some(expected_msg.as_str()));
        }
    }
}
