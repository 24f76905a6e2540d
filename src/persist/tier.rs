//! Durable Tier
//!
//! Best-effort persistence of cache entries. Every failure is logged and
//! treated as a miss; nothing here returns an error to the caller.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{duration_ms, CacheKey, Clock, SystemClock};
use crate::error::StorageError;
use crate::persist::{DurableStore, PERSIST_PREFIX};

/// On-disk shape of a durable entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurableRecord<V> {
    pub data: V,
    /// Epoch milliseconds after which the record is discarded
    pub expires_at: u64,
}

// == Durable Tier ==
#[derive(Clone)]
pub struct DurableTier {
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
}

impl DurableTier {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn DurableStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn storage_key(key: &CacheKey) -> String {
        format!("{}{}", PERSIST_PREFIX, key)
    }

    // == Persist ==
    /// Writes `value` for `key`, valid for `ttl`. Returns whether it landed.
    pub fn persist<V: Serialize>(&self, key: &CacheKey, value: &V, ttl: Duration) -> bool {
        match self.try_persist(key, value, ttl) {
            Ok(()) => {
                debug!(key = %key, "Persisted cache entry");
                true
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Failed to persist cache entry");
                false
            }
        }
    }

    fn try_persist<V: Serialize>(&self, key: &CacheKey, value: &V, ttl: Duration) -> Result<(), StorageError> {
        let record = DurableRecord {
            data: value,
            expires_at: self.clock.now_ms().saturating_add(duration_ms(ttl)),
        };
        let json = serde_json::to_string(&record)?;
        self.store.set(&Self::storage_key(key), &json)
    }

    // == Load ==
    /// Reads a live record. Expired or unreadable records are deleted.
    pub fn load_persisted<V: DeserializeOwned>(&self, key: &CacheKey) -> Option<V> {
        let storage_key = Self::storage_key(key);
        let raw = match self.store.get(&storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key = %key, error = %err, "Failed to read persisted cache entry");
                return None;
            }
        };

        match serde_json::from_str::<DurableRecord<V>>(&raw) {
            Ok(record) if self.clock.now_ms() < record.expires_at => {
                debug!(key = %key, "Loaded persisted cache entry");
                Some(record.data)
            }
            Ok(_) => {
                debug!(key = %key, "Persisted cache entry expired");
                self.remove_record(&storage_key);
                None
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Discarding corrupt persisted cache entry");
                self.remove_record(&storage_key);
                None
            }
        }
    }

    // == Clear ==
    /// Removes one record, or every record in the cache namespace when `key`
    /// is `None`. Returns how many were removed.
    pub fn clear_persisted(&self, key: Option<&CacheKey>) -> usize {
        let targets = match key {
            Some(key) => {
                let storage_key = Self::storage_key(key);
                match self.store.get(&storage_key) {
                    Ok(Some(_)) => vec![storage_key],
                    _ => Vec::new(),
                }
            }
            None => match self.store.keys() {
                Ok(keys) => keys
                    .into_iter()
                    .filter(|k| k.starts_with(PERSIST_PREFIX))
                    .collect(),
                Err(err) => {
                    warn!(error = %err, "Failed to list persisted cache entries");
                    Vec::new()
                }
            },
        };

        targets
            .iter()
            .filter(|storage_key| self.remove_record(storage_key))
            .count()
    }

    fn remove_record(&self, storage_key: &str) -> bool {
        match self.store.remove(storage_key) {
            Ok(()) => true,
            Err(err) => {
                warn!(key = storage_key, error = %err, "Failed to remove persisted cache entry");
                false
            }
        }
    }
}
