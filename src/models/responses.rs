//! Response DTOs for the inspection server
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheStats, CacheStatus};

/// Response body of `GET /cache/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Share of lookups answered from cache
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body of `GET /cache/status/:key`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub key: String,
    #[serde(flatten)]
    pub status: CacheStatus,
    pub in_flight: bool,
}

/// Response body of `DELETE /cache/keys/:pattern`.
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub pattern: String,
    pub removed: usize,
}

/// Response body of `DELETE /cache`.
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
    /// Durable records removed alongside the memory tier
    pub persisted_removed: usize,
}

impl ClearResponse {
    pub fn new(persisted_removed: usize) -> Self {
        Self {
            message: "Cache cleared".to_string(),
            persisted_removed,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    pub entries: usize,
}

impl HealthResponse {
    pub fn healthy(entries: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Freshness;
    use serde_json::{json, Value};

    #[test]
    fn test_stats_response_flattens_counters() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..CacheStats::default()
        };
        let json: Value = serde_json::to_value(StatsResponse::from(stats)).unwrap();
        assert_eq!(json["hits"], 3);
        assert_eq!(json["misses"], 1);
        assert!((json["hit_rate"].as_f64().unwrap() - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_stats_response_zero_requests() {
        let resp = StatsResponse::from(CacheStats::new());
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_status_response_serialize() {
        let resp = StatusResponse {
            key: "hospitals:all".to_string(),
            status: CacheStatus {
                freshness: Freshness::Stale,
                fresh: false,
                stale: true,
                age_ms: 150_000,
                expires_in_ms: 0,
            },
            in_flight: true,
        };
        let json: Value = serde_json::to_value(resp).unwrap();
        assert_eq!(json["key"], "hospitals:all");
        assert_eq!(json["freshness"], "stale");
        assert_eq!(json["ageMs"], 150_000);
        assert_eq!(json["in_flight"], true);
    }

    #[test]
    fn test_health_response_serialize() {
        let json = serde_json::to_value(HealthResponse::healthy(2)).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["entries"], json!(2));
        assert!(json.get("timestamp").is_some());
    }
}
