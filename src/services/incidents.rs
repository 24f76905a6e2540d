//! Incidents visible to responders and admins.

use std::time::Duration;

use serde_json::Value;

use super::{ServiceContext, ServiceResult};
use crate::cache::{CacheKey, Fetched};
use crate::client::{ApiError, Method};

const INCIDENTS_TTL: Duration = Duration::from_secs(15);
const INCIDENTS_PATH: &str = "/incidents";
const NAMESPACE: &str = "incidents";

fn list_key(include_resolved: bool) -> CacheKey {
    CacheKey::new(NAMESPACE).with(if include_resolved { "all" } else { "active" })
}

fn query(include_resolved: bool) -> Vec<(&'static str, String)> {
    vec![("include_resolved", include_resolved.to_string())]
}

#[derive(Clone)]
pub struct IncidentService {
    context: ServiceContext,
}

impl IncidentService {
    pub fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    pub async fn fetch(&self, include_resolved: bool, force_refresh: bool) -> ServiceResult<Fetched<Value>> {
        let producer = self
            .context
            .get_producer(INCIDENTS_PATH.to_string(), query(include_resolved));
        self.context
            .read(&list_key(include_resolved), producer, INCIDENTS_TTL, force_refresh)
            .await
    }

    pub fn preload(&self, include_resolved: bool) -> bool {
        let producer = self
            .context
            .get_producer(INCIDENTS_PATH.to_string(), query(include_resolved));
        self.context
            .cache
            .preload(list_key(include_resolved), producer, Some(INCIDENTS_TTL))
    }

    /// Status history of one incident. Never cached.
    pub async fn history(&self, id: u64) -> Result<Value, ApiError> {
        self.context
            .client
            .get(&format!("{}/{}/history", INCIDENTS_PATH, id), &[])
            .await
    }

    pub async fn assign(&self, id: u64, payload: Value) -> Result<Value, ApiError> {
        self.mutate(format!("{}/{}/assign", INCIDENTS_PATH, id), payload)
            .await
    }

    pub async fn update_status(&self, id: u64, payload: Value) -> Result<Value, ApiError> {
        self.mutate(format!("{}/{}/status", INCIDENTS_PATH, id), payload)
            .await
    }

    /// Assigns the caller to the closest open incident.
    pub async fn assign_nearest(&self, payload: Value) -> Result<Value, ApiError> {
        self.mutate(format!("{}/assign-nearest", INCIDENTS_PATH), payload)
            .await
    }

    async fn mutate(&self, path: String, payload: Value) -> Result<Value, ApiError> {
        self.context
            .mutate(
                Method::POST,
                &path,
                Some(payload),
                &[CacheKey::new(NAMESPACE).prefix()],
            )
            .await
    }
}
