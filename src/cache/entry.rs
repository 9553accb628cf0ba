//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// Represents a single cache entry with its stored payload and metadata.
///
/// The payload is the serialized value, compressed when `compressed` is set.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The key this entry is stored under
    pub key: String,
    /// Serialized (and possibly compressed) value
    pub payload: Vec<u8>,
    /// When the entry was stored
    pub stored_at: Instant,
    /// Expiration instant, None = no expiration
    pub expires_at: Option<Instant>,
    /// Last successful read or write
    pub last_accessed_at: Instant,
    /// Number of successful reads
    pub access_count: u64,
    /// Accounted size: key bytes plus stored payload bytes
    pub size_bytes: usize,
    /// Whether `payload` is zstd-compressed
    pub compressed: bool,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    ///
    /// # Arguments
    /// * `key` - The key the entry is stored under
    /// * `payload` - The encoded value
    /// * `compressed` - Whether the payload is compressed
    /// * `ttl` - Optional time-to-live
    pub fn new(key: String, payload: Vec<u8>, compressed: bool, ttl: Option<Duration>) -> Self {
        let now = Instant::now();
        let size_bytes = key.len() + payload.len();

        Self {
            key,
            payload,
            stored_at: now,
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
            last_accessed_at: now,
            access_count: 0,
            size_bytes,
            compressed,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Same as [`is_expired`](Self::is_expired) against a fixed instant, so a
    /// sweep sees one consistent clock reading.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Record Access ==
    /// Marks the entry as read.
    pub fn record_access(&mut self) {
        self.last_accessed_at = Instant::now();
        self.access_count += 1;
    }

    // == Time To Live ==
    /// Returns the remaining TTL, or None if no expiration is set.
    ///
    /// Returns `Some(Duration::ZERO)` once the entry has expired.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(Instant::now()))
    }
}
