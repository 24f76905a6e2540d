//! API Module
//!
//! HTTP handlers and routing for the inspection server.
//!
//! # Endpoints
//! - `GET /health` - Health check
//! - `GET /cache/stats` - Cache counters
//! - `GET /cache/status/:key` - Freshness of one entry
//! - `DELETE /cache/keys/:pattern` - Invalidate a key or a `prefix*`
//! - `DELETE /cache` - Clear both tiers
//! - `POST /preload`, `POST /preload/route` - Warm the cache
//! - `GET /hospitals`, `/blockades`, `/transfers`, `/chat/conversations`,
//!   `/incidents` - Read through the cache; `?refresh=true` forces a fetch

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
