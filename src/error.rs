//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::client::ApiError;

// == Cache Error Enum ==
/// Crate-level error for configuration, key parsing and the HTTP surface.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not present in the cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key or pattern could not be parsed
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The upstream API rejected the fetch
    #[error("Upstream error: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// The fetch was cancelled before it settled
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Fetch Error Enum ==
/// Failure of a read-through fetch.
///
/// Cloneable so a single failed operation can be handed to every caller
/// that joined it.
#[derive(Error, Debug, Clone)]
pub enum FetchError<E> {
    /// The producer failed; carries its error unchanged
    #[error("{0}")]
    Producer(E),

    /// The operation was cancelled by a cache clear or shutdown
    #[error("fetch for '{0}' was cancelled")]
    Cancelled(String),

    /// The task driving the operation panicked
    #[error("fetch task for '{key}' failed: {reason}")]
    TaskFailed { key: String, reason: String },
}

impl<E> FetchError<E> {
    /// Returns the producer's error, if that is what failed.
    pub fn producer_error(&self) -> Option<&E> {
        match self {
            FetchError::Producer(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled(_))
    }
}

// == Storage Error Enum ==
/// Failure of a durable store operation.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store refused the write because it would exceed its quota
    #[error("Quota exceeded: needed {needed} bytes, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Conversions ==
impl From<ApiError> for CacheError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound(msg) => CacheError::NotFound(msg),
            other => CacheError::Upstream {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}

impl From<FetchError<ApiError>> for CacheError {
    fn from(err: FetchError<ApiError>) -> Self {
        match err {
            FetchError::Producer(api) => api.into(),
            FetchError::Cancelled(key) => {
                CacheError::Unavailable(format!("fetch for '{}' was cancelled", key))
            }
            FetchError::TaskFailed { key, reason } => {
                CacheError::Internal(format!("fetch for '{}' failed: {}", key, reason))
            }
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidKey(_) | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            CacheError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Config(_) | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
