//! Statistics snapshot DTOs
//!
//! `StatsSnapshot` is what `stats()` returns; `StatsRecord` wraps it with a
//! timestamp for the best-effort snapshot file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{format_percent, CacheStats};

/// Point-in-time view of the cache counters and gauges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub compressions: u64,
    /// Current number of live (non-expired) entries
    pub size: usize,
    /// Sum of stored entry sizes in bytes, unswept expired entries included
    pub memory_usage: usize,
    pub max_entries: usize,
    pub max_memory_bytes: usize,
    /// hits / (hits + misses), 0.0 with no requests
    pub hit_rate: f64,
    /// `hit_rate` formatted as a percentage, e.g. `66.67%`
    pub hit_rate_percent: String,
}

impl StatsSnapshot {
    /// Builds a snapshot from counters and current gauges.
    pub fn new(
        stats: &CacheStats,
        size: usize,
        memory_usage: usize,
        max_entries: usize,
        max_memory_bytes: usize,
    ) -> Self {
        let hit_rate = stats.hit_rate();
        Self {
            hits: stats.hits,
            misses: stats.misses,
            sets: stats.sets,
            deletes: stats.deletes,
            evictions: stats.evictions,
            expirations: stats.expirations,
            compressions: stats.compressions,
            size,
            memory_usage,
            max_entries,
            max_memory_bytes,
            hit_rate,
            hit_rate_percent: format_percent(hit_rate),
        }
    }
}

/// A snapshot as persisted to `cache-stats.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRecord {
    /// Time the record was taken, RFC 3339 when serialized
    pub saved_at: DateTime<Utc>,
    pub stats: StatsSnapshot,
}

impl StatsRecord {
    /// Stamps a snapshot with the current time.
    pub fn now(stats: StatsSnapshot) -> Self {
        Self {
            saved_at: Utc::now(),
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..CacheStats::default()
        };
        let snapshot = StatsSnapshot::new(&stats, 10, 100, 1000, 4096);

        assert!((snapshot.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(snapshot.hit_rate_percent, "80.00%");
        assert_eq!(snapshot.size, 10);
    }

    #[test]
    fn test_snapshot_zero_requests() {
        let snapshot = StatsSnapshot::new(&CacheStats::default(), 0, 0, 1, 1);
        assert_eq!(snapshot.hit_rate, 0.0);
        assert_eq!(snapshot.hit_rate_percent, "0.00%");
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snapshot = StatsSnapshot::new(&CacheStats::default(), 0, 0, 1, 1);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("memoryUsage"));
        assert!(json.contains("hitRatePercent"));
    }

    #[test]
    fn test_record_serializes_timestamp() {
        let record = StatsRecord::now(StatsSnapshot::new(&CacheStats::default(), 0, 0, 1, 1));
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["savedAt"].is_string());

        let back: StatsRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
