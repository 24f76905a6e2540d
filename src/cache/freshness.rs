//! Freshness Policy
//!
//! Pure classification of an entry against the current time. All TTL and
//! grace-window arithmetic lives here.

use serde::Serialize;

use crate::cache::CacheEntry;

/// How many TTLs after creation a stale entry may still be served.
pub const STALE_GRACE_MULTIPLIER: u64 = 5;

// == Freshness ==
/// Usability of an entry at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// Within its TTL
    Fresh,
    /// Past its TTL but inside the grace window; servable while revalidating
    Stale,
    /// Past the grace window; treated as absent for reads
    Expired,
}

/// `now < expires_at`
pub fn is_fresh<V>(entry: &CacheEntry<V>, now_ms: u64) -> bool {
    now_ms < entry.expires_at()
}

/// Past the TTL but before `created_at + STALE_GRACE_MULTIPLIER * ttl`.
pub fn is_stale_but_usable<V>(entry: &CacheEntry<V>, now_ms: u64) -> bool {
    !is_fresh(entry, now_ms) && now_ms < usable_until(entry)
}

/// The instant an entry becomes unusable.
pub fn usable_until<V>(entry: &CacheEntry<V>) -> u64 {
    entry
        .created_at()
        .saturating_add(entry.ttl_ms().saturating_mul(STALE_GRACE_MULTIPLIER))
}

pub fn classify<V>(entry: &CacheEntry<V>, now_ms: u64) -> Freshness {
    if is_fresh(entry, now_ms) {
        Freshness::Fresh
    } else if is_stale_but_usable(entry, now_ms) {
        Freshness::Stale
    } else {
        Freshness::Expired
    }
}

impl Freshness {
    /// Fresh or stale entries can be served.
    pub fn is_usable(self) -> bool {
        !matches!(self, Freshness::Expired)
    }
}
