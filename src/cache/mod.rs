//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, LRU eviction, memory
//! accounting and transparent compression.

mod codec;
mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use stats::{format_percent, CacheStats};
pub use store::{BoundedCache, CacheOptions, Ttl};
