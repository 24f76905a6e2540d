//! Hospital directory, cached for two minutes and persisted for cold starts.

use std::time::Duration;

use serde_json::Value;

use super::{ServiceContext, ServiceResult};
use crate::cache::{CacheKey, Fetched, KeyPattern};
use crate::client::{ApiError, Method};

const HOSPITALS_TTL: Duration = Duration::from_secs(2 * 60);
const HOSPITALS_PATH: &str = "/hospitals";
const NAMESPACE: &str = "hospitals";

fn all_key() -> CacheKey {
    CacheKey::new(NAMESPACE).with("all")
}

fn detail_key(id: u64) -> CacheKey {
    CacheKey::new(NAMESPACE).with(id)
}

#[derive(Clone)]
pub struct HospitalService {
    context: ServiceContext,
}

impl HospitalService {
    pub fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    /// Every hospital. A persisted list answers a cold start immediately.
    pub async fn get_all(&self, force_refresh: bool) -> ServiceResult<Fetched<Value>> {
        self.context
            .read_durable(&all_key(), HOSPITALS_PATH, HOSPITALS_TTL, force_refresh)
            .await
    }

    pub async fn get_by_id(&self, id: u64, force_refresh: bool) -> ServiceResult<Fetched<Value>> {
        let producer = self
            .context
            .get_producer(format!("{}/{}", HOSPITALS_PATH, id), Vec::new());
        self.context
            .read(&detail_key(id), producer, HOSPITALS_TTL, force_refresh)
            .await
    }

    /// Cached list without fetching.
    pub fn cached(&self) -> Option<Value> {
        self.context.cached_durable(&all_key())
    }

    pub async fn create(&self, body: Value) -> Result<Value, ApiError> {
        self.mutate(Method::POST, HOSPITALS_PATH.to_string(), Some(body))
            .await
    }

    pub async fn update(&self, id: u64, body: Value) -> Result<Value, ApiError> {
        self.mutate(Method::PUT, format!("{}/{}", HOSPITALS_PATH, id), Some(body))
            .await
    }

    pub async fn delete(&self, id: u64) -> Result<Value, ApiError> {
        self.mutate(Method::DELETE, format!("{}/{}", HOSPITALS_PATH, id), None)
            .await
    }

    /// Warms the list. Returns whether a fetch started.
    pub fn preload(&self) -> bool {
        self.context
            .preload_durable(all_key(), HOSPITALS_PATH, HOSPITALS_TTL)
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
