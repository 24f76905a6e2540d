//! Resource Services Module
//!
//! Typed entry points for the upstream resources. Reads go through the
//! shared cache under each resource's keys and TTLs; mutations go straight
//! to the API and invalidate what they touched.

mod blockades;
mod chat;
mod hospitals;
mod incidents;
mod transfers;

pub use blockades::{BlockadeService, Bounds};
pub use chat::{ChatService, MessageFilter};
pub use hospitals::HospitalService;
pub use incidents::IncidentService;
pub use transfers::{TransferAction, TransferService};

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use crate::cache::{CacheKey, FetchOptions, Fetched, KeyPattern, SwrCache};
use crate::client::{ApiClient, ApiError, Method};
use crate::error::FetchError;
use crate::persist::DurableTier;

/// Cache shared by every service.
pub type ApiCache = SwrCache<Value, ApiError>;

pub type ServiceResult<T> = Result<T, FetchError<ApiError>>;

type Producer = Box<dyn FnOnce() -> BoxFuture<'static, Result<Value, ApiError>> + Send>;

// == Service Context ==
/// Collaborators every service reads and writes through.
#[derive(Clone)]
pub struct ServiceContext {
    pub cache: ApiCache,
    pub client: Arc<dyn ApiClient>,
    pub durable: DurableTier,
}

impl ServiceContext {
    pub fn new(cache: ApiCache, client: Arc<dyn ApiClient>, durable: DurableTier) -> Self {
        Self {
            cache,
            client,
            durable,
        }
    }

    /// Producer that GETs `path` with `params`.
    fn get_producer(&self, path: String, params: Vec<(&'static str, String)>) -> Producer {
        let client = Arc::clone(&self.client);
        Box::new(move || async move { client.get(&path, &params).await }.boxed())
    }

    /// Producer that GETs a list, keeps it only if it is an array, and
    /// persists it under `key`.
    fn durable_list_producer(&self, key: CacheKey, path: &'static str, ttl: Duration) -> Producer {
        let client = Arc::clone(&self.client);
        let durable = self.durable.clone();
        Box::new(move || {
            async move {
                let data = list_or_empty(client.get(path, &[]).await?);
                durable.persist(&key, &data, ttl);
                Ok::<_, ApiError>(data)
            }
            .boxed()
        })
    }

    async fn read(
        &self,
        key: &CacheKey,
        producer: Producer,
        ttl: Duration,
        force_refresh: bool,
    ) -> ServiceResult<Fetched<Value>> {
        let options = FetchOptions::new().ttl(ttl).force_refresh(force_refresh);
        self.cache.cached_fetch(key, producer, options).await
    }

    /// Reads `key`, serving a persisted record on a cold start while the
    /// real fetch runs in the background.
    async fn read_durable(
        &self,
        key: &CacheKey,
        path: &'static str,
        ttl: Duration,
        force_refresh: bool,
    ) -> ServiceResult<Fetched<Value>> {
        let in_memory = self
            .cache
            .status(key)
            .is_some_and(|status| status.freshness.is_usable());

        if !force_refresh && !in_memory {
            if let Some(persisted) = self.durable.load_persisted::<Value>(key) {
                self.cache
                    .preload(key.clone(), self.durable_list_producer(key.clone(), path, ttl), Some(ttl));
                return Ok(Fetched {
                    data: persisted,
                    from_cache: true,
                    stale: true,
                });
            }
        }

        self.read(key, self.durable_list_producer(key.clone(), path, ttl), ttl, force_refresh)
            .await
    }

    fn preload_durable(&self, key: CacheKey, path: &'static str, ttl: Duration) -> bool {
        let producer = self.durable_list_producer(key.clone(), path, ttl);
        self.cache.preload(key, producer, Some(ttl))
    }

    /// Memory first, then the durable tier.
    fn cached_durable(&self, key: &CacheKey) -> Option<Value> {
        self.cache
            .get_cached(key)
            .or_else(|| self.durable.load_persisted(key))
    }

    /// Sends a mutation and invalidates `patterns` once it succeeds.
    async fn mutate(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        patterns: &[KeyPattern],
    ) -> Result<Value, ApiError> {
        let response = self.client.send(method, path, body).await?;
        for pattern in patterns {
            self.cache.invalidate(pattern);
        }
        Ok(response)
    }
}

// == JSON Helpers ==
/// Keeps arrays, replaces anything else with an empty array.
pub(crate) fn list_or_empty(value: Value) -> Value {
    if value.is_array() {
        value
    } else {
        Value::Array(Vec::new())
    }
}

/// Unwraps a `{ "data": ... }` envelope; other values pass through.
pub(crate) fn data_field(value: Value) -> Value {
    match value {
        Value::Object(mut map) => match map.remove("data") {
            Some(inner) => inner,
            None => Value::Object(map),
        },
        other => other,
    }
}

/// Shallow merge of `update`'s fields over `current`.
pub(crate) fn merge_fields(current: &Value, update: &Value) -> Value {
    match (current, update) {
        (Value::Object(current), Value::Object(update)) => {
            let mut merged = current.clone();
            for (field, value) in update {
                merged.insert(field.clone(), value.clone());
            }
            Value::Object(merged)
        }
        _ => update.clone(),
    }
}

/// Replaces the item with the same `id` (merging fields) or prepends it.
pub(crate) fn upsert_by_id(items: &[Value], item: &Value) -> Vec<Value> {
    let id = &item["id"];
    let mut updated = items.to_vec();
    match updated.iter().position(|existing| &existing["id"] == id) {
        Some(index) => {
            let merged = merge_fields(&updated[index], item);
            updated[index] = merged;
        }
        None => updated.insert(0, item.clone()),
    }
    updated
}

// == Services ==
/// All resource services over one shared context.
#[derive(Clone)]
pub struct Services {
    pub hospitals: HospitalService,
    pub blockades: BlockadeService,
    pub chat: ChatService,
    pub transfers: TransferService,
    pub incidents: IncidentService,
    context: ServiceContext,
}

impl Services {
    pub fn new(context: ServiceContext) -> Self {
        Self {
            hospitals: HospitalService::new(context.clone()),
            blockades: BlockadeService::new(context.clone()),
            chat: ChatService::new(context.clone()),
            transfers: TransferService::new(context.clone()),
            incidents: IncidentService::new(context.clone()),
            context,
        }
    }

    pub fn cache(&self) -> &ApiCache {
        &self.context.cache
    }

    pub fn durable(&self) -> &DurableTier {
        &self.context.durable
    }
}
