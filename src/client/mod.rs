//! Upstream API Client Module
//!
//! The HTTP collaborator the resource services fetch through. The cache
//! never interprets its results; it only stores them.

mod error;
mod http;
mod mock;

pub use error::ApiError;
pub use http::HttpClient;
pub use mock::{MockApiClient, RecordedCall};
pub use reqwest::Method;

use async_trait::async_trait;
use serde_json::Value;

/// JSON API the services read and mutate.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// GET `path` with query parameters.
    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, ApiError>;

    /// Sends a request with an optional JSON body.
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError>;
}
