//! Kalinga Cache - client-side API cache with stale-while-revalidate
//!
//! Serves API reads from memory when fresh, serves stale data while a single
//! background refresh runs, shares one request among concurrent readers and
//! keeps selected lists in a durable tier for cold starts.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod persist;
pub mod preload;
pub mod services;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheKey, FetchOptions, Fetched, KeyPattern, SwrCache};
pub use config::{CacheConfig, Config};
pub use error::{CacheError, FetchError};
pub use preload::{Preloader, UserRole};
pub use services::Services;
