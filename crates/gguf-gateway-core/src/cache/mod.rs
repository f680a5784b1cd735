//! Caching for upstream API responses.
//!
//! Responses are kept in memory only; nothing survives a restart.

mod response;

pub use response::{CacheEntry, CacheKey, ResponseCache};
