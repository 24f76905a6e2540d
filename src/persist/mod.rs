//! Durable Tier Module
//!
//! Survives restarts by writing selected entries as JSON records to a
//! string-keyed store, and seeds cold starts from them.

mod storage;
mod tier;

pub use storage::{DurableStore, FileStore, MemoryStore};
pub use tier::{DurableRecord, DurableTier};

use std::time::Duration;

/// Namespace prepended to every durable record key.
pub const PERSIST_PREFIX: &str = "kalinga_cache_";

/// Lifetime of a durable record written without an explicit TTL.
pub const DEFAULT_PERSIST_TTL: Duration = Duration::from_secs(5 * 60);
