//! Road blockades.
//!
//! The full list lives for a minute and is persisted so a restart can
//! render it immediately. Map-bounded queries live for 30 seconds under a
//! key rounded to three decimals, so small pans share an entry.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use super::{list_or_empty, ServiceContext, ServiceResult};
use crate::cache::{CacheKey, Fetched};
use crate::client::{ApiError, Method};

const BLOCKADES_TTL: Duration = Duration::from_secs(60);
const BLOCKADES_BOUNDS_TTL: Duration = Duration::from_secs(30);
const BLOCKADES_PATH: &str = "/road-blockades";
const NAMESPACE: &str = "blockades";

/// Visible map area.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    fn cache_key(&self) -> CacheKey {
        CacheKey::new(NAMESPACE)
            .with(format!("{:.3}", self.north))
            .with(format!("{:.3}", self.south))
            .with(format!("{:.3}", self.east))
            .with(format!("{:.3}", self.west))
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("north", self.north.to_string()),
            ("south", self.south.to_string()),
            ("east", self.east.to_string()),
            ("west", self.west.to_string()),
        ]
    }
}

fn all_key() -> CacheKey {
    CacheKey::new(NAMESPACE).with("all")
}

#[derive(Clone)]
pub struct BlockadeService {
    context: ServiceContext,
}

impl BlockadeService {
    pub fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    pub async fn get_all(&self, force_refresh: bool) -> ServiceResult<Fetched<Value>> {
        self.context
            .read_durable(&all_key(), BLOCKADES_PATH, BLOCKADES_TTL, force_refresh)
            .await
    }

    pub async fn get_by_bounds(&self, bounds: Bounds, force_refresh: bool) -> ServiceResult<Fetched<Value>> {
        let producer = self
            .context
            .get_producer(BLOCKADES_PATH.to_string(), bounds.query());
        let fetched = self
            .context
            .read(&bounds.cache_key(), producer, BLOCKADES_BOUNDS_TTL, force_refresh)
            .await?;
        Ok(fetched.map(list_or_empty))
    }

    /// Cached full list without fetching, from memory or the durable tier.
    pub fn cached(&self) -> Option<Value> {
        self.context.cached_durable(&all_key())
    }

    pub async fn create(&self, body: Value) -> Result<Value, ApiError> {
        self.mutate(Method::POST, BLOCKADES_PATH.to_string(), Some(body))
            .await
    }

    pub async fn update(&self, id: u64, body: Value) -> Result<Value, ApiError> {
        self.mutate(Method::PUT, format!("{}/{}", BLOCKADES_PATH, id), Some(body))
            .await
    }

    /// Marks a blockade as cleared.
    pub async fn remove(&self, id: u64) -> Result<Value, ApiError> {
        self.mutate(Method::PATCH, format!("{}/{}/remove", BLOCKADES_PATH, id), None)
            .await
    }

    /// Blockades intersecting a route. Never cached.
    pub async fn route_blockades(&self, route: Value) -> Result<Value, ApiError> {
        self.context
            .client
            .send(
                Method::POST,
                &format!("{}/route", BLOCKADES_PATH),
                Some(json!({ "route": route })),
            )
            .await
    }

    pub fn preload(&self) -> bool {
        self.context
            .preload_durable(all_key(), BLOCKADES_PATH, BLOCKADES_TTL)
    }

    async fn mutate(&self, method: Method, path: String, body: Option<Value>) -> Result<Value, ApiError> {
        let response = self
            .context
            .mutate(method, &path, body, &[CacheKey::new(NAMESPACE).prefix()])
            .await?;
        self.context.durable.clear_persisted(Some(&all_key()));
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{harness, harness_with};
    use crate::client::MockApiClient;
    use futures::future::join_all;

    const MANILA: Bounds = Bounds {
        north: 14.6543,
        south: 14.5012,
        east: 121.0567,
        west: 120.9501,
    };

    #[test]
    fn test_bounds_key_is_rounded() {
        assert_eq!(
            MANILA.cache_key().to_string(),
            "blockades:14.654:14.501:121.057:120.950"
        );
        let nudged = Bounds {
            north: 14.65401,
            ..MANILA
        };
        assert_eq!(nudged.cache_key(), MANILA.cache_key());
    }

    #[tokio::test]
    async fn test_get_all_normalizes_non_list() {
        let h = harness();
        h.api.on_get("/road-blockades", json!({"message": "maintenance"}));
        let service = BlockadeService::new(h.context.clone());

        let fetched = service.get_all(false).await.unwrap();
        assert_eq!(fetched.data, json!([]));
    }

    #[tokio::test]
    async fn test_bounds_query_params() {
        let h = harness();
        h.api.on_get("/road-blockades", json!([{"id": 4}]));
        let service = BlockadeService::new(h.context.clone());

        let fetched = service.get_by_bounds(MANILA, false).await.unwrap();

        assert_eq!(fetched.data, json!([{"id": 4}]));
        let call = &h.api.calls()[0];
        assert!(call.params.contains(&("north".to_string(), "14.6543".to_string())));
        assert!(call.params.contains(&("west".to_string(), "120.9501".to_string())));
    }

    #[tokio::test]
    async fn test_concurrent_reads_share_request() {
        let h = harness_with(MockApiClient::new().with_delay(Duration::from_millis(20)));
        h.api.on_get("/road-blockades", json!([{"id": 1}]));
        let service = BlockadeService::new(h.context.clone());

        let results = join_all((0..4).map(|_| service.get_all(false))).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(h.api.call_count(Method::GET, "/road-blockades"), 1);
    }

    #[tokio::test]
    async fn test_expired_persisted_list_is_ignored() {
        let h = harness();
        h.api.on_get("/road-blockades", json!([{"id": "fresh"}]));
        h.context
            .durable
            .persist(&all_key(), &json!([{"id": "old"}]), BLOCKADES_TTL);
        h.clock.advance(BLOCKADES_TTL);
        let service = BlockadeService::new(h.context.clone());

        let fetched = service.get_all(false).await.unwrap();

        assert_eq!(fetched.data, json!([{"id": "fresh"}]));
        assert!(!fetched.from_cache);
    }

    #[tokio::test]
    async fn test_force_refresh_skips_persisted_list() {
        let h = harness();
        h.api.on_get("/road-blockades", json!([{"id": "fresh"}]));
        h.context
            .durable
            .persist(&all_key(), &json!([{"id": "old"}]), BLOCKADES_TTL);
        let service = BlockadeService::new(h.context.clone());

        let fetched = service.get_all(true).await.unwrap();
        assert_eq!(fetched.data, json!([{"id": "fresh"}]));
    }

    #[tokio::test]
    async fn test_mutations_invalidate_all_blockade_keys() {
        let h = harness();
        h.api.on_get("/road-blockades", json!([]));
        h.api.on(Method::PATCH, "/road-blockades/3/remove", Ok(json!({"ok": true})));
        let service = BlockadeService::new(h.context.clone());
        service.get_all(false).await.unwrap();
        service.get_by_bounds(MANILA, false).await.unwrap();
        assert_eq!(h.context.cache.len(), 2);

        service.remove(3).await.unwrap();

        assert!(h.context.cache.is_empty());
        assert!(service.cached().is_none());
    }

    #[tokio::test]
    async fn test_route_blockades_is_uncached() {
        let h = harness();
        h.api.on(Method::POST, "/road-blockades/route", Ok(json!([{"id": 9}])));
        let service = BlockadeService::new(h.context.clone());

        let route = json!([[14.6, 121.0], [14.7, 121.1]]);
        service.route_blockades(route.clone()).await.unwrap();
        service.route_blockades(route.clone()).await.unwrap();

        assert_eq!(h.api.call_count(Method::POST, "/road-blockades/route"), 2);
        assert_eq!(h.api.calls()[0].body, Some(json!({ "route": route })));
        assert!(h.context.cache.is_empty());
    }
}
