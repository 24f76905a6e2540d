//! Configuration Module
//!
//! Handles loading and managing cache and server configuration from
//! environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
use crate::error::{CacheError, Result};

/// Directory name used under the platform cache dir for durable records.
const PERSIST_DIR_NAME: &str = "kalinga-cache";

/// Sizing for one [`SwrCache`](crate::cache::SwrCache) instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Entries kept before the least recently used one is evicted
    pub max_entries: usize,
    /// TTL applied when a write does not carry its own
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            default_ttl: DEFAULT_TTL,
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries each cache can hold
    pub max_entries: usize,
    /// Default TTL in milliseconds for entries without explicit TTL
    pub default_ttl_ms: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Base URL of the upstream API
    pub api_base_url: String,
    /// Bearer token sent with upstream requests
    pub api_token: Option<String>,
    /// Upstream request timeout in seconds
    pub request_timeout_secs: u64,
    /// Whether durable records are written and read
    pub persist_enabled: bool,
    /// Directory holding durable records
    pub persist_dir: PathBuf,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 100)
    /// - `DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 30000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `API_BASE_URL` - Upstream API (default: http://localhost:8000/api)
    /// - `API_TOKEN` - Bearer token (default: none)
    /// - `REQUEST_TIMEOUT_SECS` - Upstream timeout (default: 30)
    /// - `PERSIST_ENABLED` - Durable tier on/off (default: true)
    /// - `PERSIST_DIR` - Durable tier directory (default: platform cache dir)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            default_ttl_ms: env_or("DEFAULT_TTL_MS", defaults.default_ttl_ms),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            api_token: env::var("API_TOKEN").ok().filter(|t| !t.is_empty()),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            persist_enabled: env_or("PERSIST_ENABLED", defaults.persist_enabled),
            persist_dir: env::var("PERSIST_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.persist_dir),
        }
    }

    /// Rejects values the cache cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::Config("MAX_ENTRIES must be at least 1".to_string()));
        }
        if self.default_ttl_ms == 0 {
            return Err(CacheError::Config("DEFAULT_TTL_MS must be positive".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(CacheError::Config(
                "REQUEST_TIMEOUT_SECS must be positive".to_string(),
            ));
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(CacheError::Config(format!(
                "API_BASE_URL '{}' is not an http(s) URL",
                self.api_base_url
            )));
        }
        Ok(())
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Sizing shared by every cache the server creates.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_entries: self.max_entries,
            default_ttl: self.default_ttl(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            default_ttl_ms: DEFAULT_TTL.as_millis() as u64,
            server_port: 3000,
            api_base_url: "http://localhost:8000/api".to_string(),
            api_token: None,
            request_timeout_secs: 30,
            persist_enabled: true,
            persist_dir: dirs::cache_dir()
                .unwrap_or_else(env::temp_dir)
                .join(PERSIST_DIR_NAME),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
