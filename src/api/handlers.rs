//! API Handlers
//!
//! HTTP request handlers for the inspection server. Resource routes read
//! through the shared cache exactly as an in-process caller would.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::cache::{CacheKey, Fetched, KeyPattern, SwrCache};
use crate::client::{ApiClient, HttpClient};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    BlockadeQuery, ClearResponse, HealthResponse, IncidentQuery, InvalidateResponse,
    PreloadRequest, ReadQuery, RoutePreloadRequest, StatsResponse, StatusResponse,
    TransferListQuery,
};
use crate::persist::{DurableStore, DurableTier, FileStore, MemoryStore};
use crate::preload::{PreloadSummary, Preloader};
use crate::services::{ApiCache, ServiceContext, Services};

// == Application State ==
/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub preloader: Arc<Preloader>,
}

impl AppState {
    pub fn new(context: ServiceContext) -> Self {
        let services = Services::new(context);
        Self {
            preloader: Arc::new(Preloader::new(services.clone())),
            services,
        }
    }

    /// Wires the HTTP client, durable tier and cache from configuration.
    ///
    /// Falls back to an in-memory durable store when the directory cannot
    /// be used.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = HttpClient::from_config(config)
            .map_err(|e| CacheError::Config(format!("HTTP client: {}", e)))?;

        let store: Arc<dyn DurableStore> = if config.persist_enabled {
            match FileStore::new(config.persist_dir.clone()) {
                Ok(store) => {
                    info!(dir = %store.dir().display(), "Durable tier on disk");
                    Arc::new(store)
                }
                Err(e) => {
                    warn!(error = %e, "Durable directory unusable, keeping records in memory");
                    Arc::new(MemoryStore::new())
                }
            }
        } else {
            Arc::new(MemoryStore::new())
        };

        let cache = SwrCache::new(&config.cache_config());
        let client: Arc<dyn ApiClient> = Arc::new(client);
        Ok(Self::new(ServiceContext::new(
            cache,
            client,
            DurableTier::new(store),
        )))
    }

    pub fn cache(&self) -> &ApiCache {
        self.services.cache()
    }
}

// == Cache Inspection ==
/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache().len()))
}

/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.cache().stats().into())
}

/// Handler for GET /cache/status/:key
///
/// 404 when nothing is stored under the key.
pub async fn status_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<StatusResponse>> {
    let key: CacheKey = raw.parse()?;
    let status = state
        .cache()
        .status(&key)
        .ok_or_else(|| CacheError::NotFound(raw.clone()))?;

    Ok(Json(StatusResponse {
        key: key.to_string(),
        status,
        in_flight: state.cache().is_in_flight(&key),
    }))
}

/// Handler for DELETE /cache/keys/:pattern
///
/// A trailing `*` removes every key under the prefix.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    let pattern: KeyPattern = raw.parse()?;
    let removed = state.cache().invalidate(&pattern);
    Ok(Json(InvalidateResponse {
        pattern: pattern.to_string(),
        removed,
    }))
}

/// Handler for DELETE /cache
///
/// Empties both tiers and forgets the sign-in preload.
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache().clear();
    let persisted_removed = state.services.durable().clear_persisted(None);
    state.preloader.reset();
    Json(ClearResponse::new(persisted_removed))
}

// == Preloading ==
/// Handler for POST /preload
pub async fn preload_handler(
    State(state): State<AppState>,
    Json(req): Json<PreloadRequest>,
) -> Json<PreloadSummary> {
    Json(state.preloader.preload_critical_data(req.role, req.force))
}

/// Handler for POST /preload/route
pub async fn route_preload_handler(
    State(state): State<AppState>,
    Json(req): Json<RoutePreloadRequest>,
) -> Result<Json<PreloadSummary>> {
    if let Some(error) = req.validate() {
        return Err(CacheError::InvalidRequest(error));
    }
    Ok(Json(state.preloader.preload_for_route(&req.route)))
}

// == Read-Through Resources ==
type ReadResult = Result<Json<Fetched<Value>>>;

/// Handler for GET /hospitals
pub async fn hospitals_handler(
    State(state): State<AppState>,
    Query(query): Query<ReadQuery>,
) -> ReadResult {
    let fetched = state.services.hospitals.get_all(query.refresh).await?;
    Ok(Json(fetched))
}

/// Handler for GET /hospitals/:id
pub async fn hospital_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(query): Query<ReadQuery>,
) -> ReadResult {
    let fetched = state
        .services
        .hospitals
        .get_by_id(id, query.refresh)
        .await?;
    Ok(Json(fetched))
}

/// Handler for GET /blockades
///
/// With `north`, `south`, `east` and `west` the list is narrowed to the map
/// area; with none of them the full list is returned.
pub async fn blockades_handler(
    State(state): State<AppState>,
    Query(query): Query<BlockadeQuery>,
) -> ReadResult {
    let blockades = &state.services.blockades;
    let fetched = match query.bounds()? {
        Some(bounds) => blockades.get_by_bounds(bounds, query.refresh).await?,
        None => blockades.get_all(query.refresh).await?,
    };
    Ok(Json(fetched))
}

/// Handler for GET /transfers
pub async fn transfers_handler(
    State(state): State<AppState>,
    Query(query): Query<TransferListQuery>,
) -> ReadResult {
    let fetched = state
        .services
        .transfers
        .fetch_transfers(query.active, query.refresh)
        .await?;
    Ok(Json(fetched))
}

/// Handler for GET /transfers/:id
pub async fn transfer_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(query): Query<ReadQuery>,
) -> ReadResult {
    let fetched = state
        .services
        .transfers
        .fetch_transfer(id, query.refresh)
        .await?;
    Ok(Json(fetched))
}

/// Handler for GET /chat/conversations
pub async fn conversations_handler(
    State(state): State<AppState>,
    Query(query): Query<ReadQuery>,
) -> ReadResult {
    let fetched = state.services.chat.get_conversations(query.refresh).await?;
    Ok(Json(fetched))
}

/// Handler for GET /incidents
pub async fn incidents_handler(
    State(state): State<AppState>,
    Query(query): Query<IncidentQuery>,
) -> ReadResult {
    let fetched = state
        .services
        .incidents
        .fetch(query.include_resolved, query.refresh)
        .await?;
    Ok(Json(fetched))
}
