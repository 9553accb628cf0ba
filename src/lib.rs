//! Doc Cache - A memory-bounded in-process cache
//!
//! Provides TTL expiration, LRU eviction, optional compression and
//! deterministic disposal of timers, listeners and nested resources.

pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod models;
pub mod service;
pub mod tasks;

pub use cache::{BoundedCache, CacheOptions, Ttl};
pub use config::Config;
pub use error::{CacheError, Result};
pub use lifecycle::{with_resource, Disposable, DisposableBase, Release, ScopedResource};
pub use logging::{CacheLogger, TracingLogger};
pub use models::StatsSnapshot;
pub use service::CacheService;
