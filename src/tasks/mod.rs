//! Background Tasks Module
//!
//! Owns the fetches the cache runs outside of any caller.
//!
//! # Tasks
//! - Background revalidation of stale entries
//! - Preloads
//! - Foreground fetches, so they settle even when every caller is dropped

mod background;

pub use background::BackgroundTasks;
