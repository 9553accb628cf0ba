//! Bounded Cache Module
//!
//! Main cache engine combining HashMap storage with LRU tracking, TTL
//! expiration, entry/memory limits and transparent compression.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use crate::cache::codec;
use crate::cache::{CacheEntry, CacheStats, LruTracker};
use crate::config::{
    Config, DEFAULT_COMPRESSION_THRESHOLD, DEFAULT_MAX_ENTRIES, DEFAULT_MAX_MEMORY_SIZE,
    DEFAULT_TTL_MS,
};
use crate::error::{CacheError, Result};
use crate::models::StatsSnapshot;

// == TTL ==
/// Expiry requested for a single write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ttl {
    /// Use the cache's default TTL
    #[default]
    Default,
    /// Never expire, regardless of the default
    Never,
    /// Expire after the given duration
    After(Duration),
}

impl From<Duration> for Ttl {
    fn from(ttl: Duration) -> Self {
        Ttl::After(ttl)
    }
}

// == Cache Options ==
/// Limits and behaviour of a [`BoundedCache`].
#[derive(Debug, Clone, PartialEq)]
pub struct CacheOptions {
    /// Maximum number of live entries (at least 1)
    pub max_entries: usize,
    /// Maximum sum of entry sizes in bytes
    pub max_memory_bytes: usize,
    /// TTL applied by `Ttl::Default`, None = never expire
    pub default_ttl: Option<Duration>,
    pub compression: bool,
    /// Serialized size at which values get compressed
    pub compression_threshold_bytes: usize,
    pub enable_statistics: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_memory_bytes: DEFAULT_MAX_MEMORY_SIZE,
            default_ttl: Some(Duration::from_millis(DEFAULT_TTL_MS)),
            compression: true,
            compression_threshold_bytes: DEFAULT_COMPRESSION_THRESHOLD,
            enable_statistics: true,
        }
    }
}

impl From<&Config> for CacheOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_entries: config.max_entries,
            max_memory_bytes: config.max_memory_size,
            default_ttl: config.default_ttl_duration(),
            compression: config.compression,
            compression_threshold_bytes: config.compression_threshold,
            enable_statistics: config.enable_statistics,
        }
    }
}

// == Bounded Cache ==
/// Main cache storage with LRU eviction, memory accounting and TTL support.
///
/// Methods take `&mut self`; callers sharing a cache wrap it in a lock.
#[derive(Debug)]
pub struct BoundedCache {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Sum of `size_bytes` over `entries`
    memory_usage: usize,
    options: CacheOptions,
    disposed: bool,
}

impl BoundedCache {
    // == Constructor ==
    /// Creates a new BoundedCache with the given options.
    ///
    /// A `max_entries` of zero is raised to one.
    pub fn new(mut options: CacheOptions) -> Self {
        options.max_entries = options.max_entries.max(1);
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            memory_usage: 0,
            options,
            disposed: false,
        }
    }

    /// Creates a cache with default options except for the two limits.
    pub fn with_limits(max_entries: usize, max_memory_bytes: usize) -> Self {
        Self::new(CacheOptions {
            max_entries,
            max_memory_bytes,
            ..CacheOptions::default()
        })
    }

    // == Set ==
    /// Stores a value under `key`.
    ///
    /// The value is serialized, compressed when it reaches the compression
    /// threshold, and inserted as most recently used. Least recently used
    /// entries are evicted until both limits hold. If the key already exists
    /// the old entry is replaced.
    ///
    /// On a serialization, compression or size failure the cache is left
    /// unchanged.
    pub fn set<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
        ttl: impl Into<Ttl>,
    ) -> Result<()> {
        self.ensure_usable()?;

        let threshold = self
            .options
            .compression
            .then_some(self.options.compression_threshold_bytes);
        let encoded = codec::encode(value, threshold)?;

        let size = key.len() + encoded.bytes.len();
        if size > self.options.max_memory_bytes {
            return Err(CacheError::EntryTooLarge {
                size,
                max: self.options.max_memory_bytes,
            });
        }

        // Overwrite: the old size no longer counts
        self.remove_entry(key);
        self.make_room(size);

        if encoded.compressed {
            trace!(key, original = encoded.original_len, stored = encoded.bytes.len(), "compressed value");
            self.record(CacheStats::record_compression);
        }

        let ttl = match ttl.into() {
            Ttl::Default => self.options.default_ttl,
            Ttl::Never => None,
            Ttl::After(ttl) => Some(ttl),
        };
        let entry = CacheEntry::new(key.to_string(), encoded.bytes, encoded.compressed, ttl);
        self.memory_usage += entry.size_bytes;
        self.entries.insert(key.to_string(), entry);
        self.lru.touch(key);
        self.record(CacheStats::record_set);

        Ok(())
    }

    // == Get ==
    /// Retrieves and deserializes a value by key.
    ///
    /// Returns `Ok(None)` for absent or expired keys; expired entries are
    /// removed on access. A stored value that cannot be deserialized into `T`
    /// counts as a miss and is reported as an error, the entry stays.
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        self.ensure_usable()?;

        let lookup = self.entries.get(key).map(|entry| {
            if entry.is_expired() {
                None
            } else {
                Some(codec::decode::<T>(&entry.payload, entry.compressed))
            }
        });

        match lookup {
            None => {
                self.record(CacheStats::record_miss);
                Ok(None)
            }
            Some(None) => {
                self.expire(key);
                self.record(CacheStats::record_miss);
                Ok(None)
            }
            Some(Some(Err(err))) => {
                self.record(CacheStats::record_miss);
                Err(err)
            }
            Some(Some(Ok(value))) => {
                if let Some(entry) = self.entries.get_mut(key) {
                    entry.record_access();
                }
                self.lru.touch(key);
                self.record(CacheStats::record_hit);
                Ok(Some(value))
            }
        }
    }

    // == Has ==
    /// Checks presence without touching statistics or recency order.
    ///
    /// Expired entries are removed.
    pub fn has(&mut self, key: &str) -> Result<bool> {
        self.ensure_usable()?;

        match self.entries.get(key).map(CacheEntry::is_expired) {
            None => Ok(false),
            Some(true) => {
                self.expire(key);
                Ok(false)
            }
            Some(false) => Ok(true),
        }
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether a removal occurred.
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        self.ensure_usable()?;

        if self.remove_entry(key).is_some() {
            self.record(CacheStats::record_delete);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // == Clear ==
    /// Removes all entries. Counters are kept.
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_usable()?;

        self.entries.clear();
        self.lru.clear();
        self.memory_usage = 0;
        Ok(())
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed. A disposed cache has nothing to
    /// clean and returns 0.
    pub fn cleanup(&mut self) -> usize {
        if self.disposed {
            return 0;
        }

        let now = Instant::now();
        let expired_keys: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| entry.key.clone())
            .collect();

        for key in &expired_keys {
            self.expire(key);
        }

        expired_keys.len()
    }

    // == Stats ==
    /// Returns current cache statistics.
    ///
    /// `size` counts live entries only; `memory_usage` still includes expired
    /// entries until they are swept.
    pub fn stats(&self) -> StatsSnapshot {
        let now = Instant::now();
        let live = self
            .entries
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .count();

        StatsSnapshot::new(
            &self.stats,
            live,
            self.memory_usage,
            self.options.max_entries,
            self.options.max_memory_bytes,
        )
    }

    // == Dispose ==
    /// Drops all entries and makes the cache unusable. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        debug!(entries = self.entries.len(), "disposing bounded cache");
        self.entries.clear();
        self.lru.clear();
        self.memory_usage = 0;
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    // == Introspection ==
    /// Returns the current number of entries, expired-but-unswept included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Incrementally maintained sum of entry sizes.
    pub fn memory_usage(&self) -> usize {
        self.memory_usage
    }

    /// Sums entry sizes from scratch; always equals `memory_usage()`.
    pub fn recompute_memory_usage(&self) -> usize {
        self.entries.values().map(|entry| entry.size_bytes).sum()
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> Vec<String> {
        self.lru.iter().map(str::to_string).collect()
    }

    /// Remaining TTL of a key, `None` if absent or without expiry.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        self.entries.get(key).and_then(CacheEntry::ttl_remaining)
    }

    // == Internals ==
    fn ensure_usable(&self) -> Result<()> {
        if self.disposed {
            Err(CacheError::Disposed)
        } else {
            Ok(())
        }
    }

    fn record(&mut self, update: fn(&mut CacheStats)) {
        if self.options.enable_statistics {
            update(&mut self.stats);
        }
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        self.memory_usage -= entry.size_bytes;
        Some(entry)
    }

    fn expire(&mut self, key: &str) {
        if self.remove_entry(key).is_some() {
            trace!(key, "expired entry removed");
            self.record(CacheStats::record_expiration);
        }
    }

    fn over_limit(&self, incoming: usize) -> bool {
        self.entries.len() >= self.options.max_entries
            || self.memory_usage + incoming > self.options.max_memory_bytes
    }

    /// Makes room for an entry of `incoming` bytes.
    ///
    /// Expired entries are swept first so only live entries are evicted, then
    /// the LRU end is evicted until the entry fits. Terminates once the cache
    /// is empty.
    fn make_room(&mut self, incoming: usize) {
        if !self.over_limit(incoming) {
            return;
        }

        let swept = self.cleanup();
        if swept > 0 {
            trace!(swept, "swept expired entries before eviction");
        }

        while self.over_limit(incoming) {
            let Some(oldest) = self.lru.evict_oldest() else {
                break;
            };
            let Some(entry) = self.entries.remove(&oldest) else {
                continue;
            };
            self.memory_usage -= entry.size_bytes;
            debug!(key = %oldest, size = entry.size_bytes, "evicted least recently used entry");
            self.record(CacheStats::record_eviction);
        }
    }
}
