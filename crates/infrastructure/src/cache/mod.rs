//! Cache implementations
//!
//! - `ResponseCache`: in-memory moka cache of normalized upstream responses,
//!   with per-kind TTL and coalescing of concurrent identical requests

mod response_cache;

pub use response_cache::{CacheStats, CacheTtls, CachedRecords, ResponseCache};
