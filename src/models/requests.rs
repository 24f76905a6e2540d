//! Request DTOs for the inspection server
//!
//! Bodies and query strings accepted by the HTTP surface.

use serde::Deserialize;

use crate::error::{CacheError, Result};
use crate::preload::UserRole;
use crate::services::Bounds;

/// Body of `POST /preload`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreloadRequest {
    #[serde(default)]
    pub role: Option<UserRole>,
    /// Run again even if the sign-in preload already ran
    #[serde(default)]
    pub force: bool,
}

/// Body of `POST /preload/route`.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutePreloadRequest {
    pub route: String,
}

impl RoutePreloadRequest {
    pub fn validate(&self) -> Option<String> {
        if self.route.trim().is_empty() {
            return Some("Route cannot be empty".to_string());
        }
        None
    }
}

/// `?refresh=true` on any read-through route.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ReadQuery {
    #[serde(default)]
    pub refresh: bool,
}

/// Query of `GET /blockades`. Bounds are all-or-nothing.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BlockadeQuery {
    pub north: Option<f64>,
    pub south: Option<f64>,
    pub east: Option<f64>,
    pub west: Option<f64>,
    #[serde(default)]
    pub refresh: bool,
}

impl BlockadeQuery {
    /// `Ok(None)` when no bounds were given.
    pub fn bounds(&self) -> Result<Option<Bounds>> {
        match (self.north, self.south, self.east, self.west) {
            (Some(north), Some(south), Some(east), Some(west)) => Ok(Some(Bounds {
                north,
                south,
                east,
                west,
            })),
            (None, None, None, None) => Ok(None),
            _ => Err(CacheError::InvalidRequest(
                "bounds need north, south, east and west".to_string(),
            )),
        }
    }
}

/// Query of `GET /transfers`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TransferListQuery {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub refresh: bool,
}

/// Query of `GET /incidents`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct IncidentQuery {
    #[serde(default)]
    pub include_resolved: bool,
    #[serde(default)]
    pub refresh: bool,
}
