//! TTL Cleanup Task
//!
//! Background sweep that periodically removes expired cache entries, so cold
//! keys that are never read again still give their memory back.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::cache::BoundedCache;
use crate::error::Result;
use crate::lifecycle::{DisposableBase, TimerId};
use crate::logging::CacheLogger;

/// Registers the periodic cleanup sweep as an interval owned by `owner`.
///
/// The sweep stops when `owner` is disposed. The lock is held only for the
/// synchronous `cleanup()` call.
///
/// # Example
/// ```ignore
/// let owner = DisposableBase::new("docs-cache");
/// let cache = Arc::new(Mutex::new(BoundedCache::new(CacheOptions::default())));
/// register_cleanup_task(&owner, cache.clone(), Duration::from_secs(300), logger)?;
/// // Later, during shutdown:
/// owner.dispose()?;
/// ```
pub fn register_cleanup_task(
    owner: &DisposableBase,
    cache: Arc<Mutex<BoundedCache>>,
    period: Duration,
    logger: Arc<dyn CacheLogger>,
) -> Result<TimerId> {
    let sweep_logger = Arc::clone(&logger);
    let id = owner.set_interval(period, move || {
        let cache = Arc::clone(&cache);
        let logger = Arc::clone(&sweep_logger);
        async move {
            run_cleanup(&cache, logger.as_ref());
        }
    })?;

    logger.debug(&format!(
        "Started TTL cleanup task with interval of {}ms",
        period.as_millis()
    ));
    Ok(id)
}

/// One sweep: removes expired entries and logs the outcome.
pub fn run_cleanup(cache: &Mutex<BoundedCache>, logger: &dyn CacheLogger) -> usize {
    let removed = cache.lock().cleanup();

    if removed > 0 {
        logger.info(&format!("TTL cleanup: removed {} expired entries", removed));
    } else {
        logger.debug("TTL cleanup: no expired entries found");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheOptions, Ttl};
    use crate::logging::TracingLogger;

    fn shared_cache() -> Arc<Mutex<BoundedCache>> {
        Arc::new(Mutex::new(BoundedCache::new(CacheOptions::default())))
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let cache = shared_cache();
        cache
            .lock()
            .set("expire_soon", "value", Duration::from_millis(30))
            .unwrap();

        let owner = DisposableBase::new("test");
        register_cleanup_task(
            &owner,
            cache.clone(),
            Duration::from_millis(50),
            Arc::new(TracingLogger::default()),
        )
        .unwrap();

        // Wait for entry to expire and cleanup to run
        tokio::time::sleep(Duration::from_millis(200)).await;

        // The sweep removed it without anyone reading the key
        assert_eq!(cache.lock().len(), 0);
        assert_eq!(cache.lock().stats().expirations, 1);

        owner.dispose().unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let cache = shared_cache();
        cache.lock().set("long_lived", "value", Ttl::Never).unwrap();

        let owner = DisposableBase::new("test");
        register_cleanup_task(
            &owner,
            cache.clone(),
            Duration::from_millis(20),
            Arc::new(TracingLogger::default()),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(
            cache.lock().get::<String>("long_lived").unwrap(),
            Some("value".to_string())
        );
        owner.dispose().unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_on_dispose() {
        let cache = shared_cache();
        let owner = DisposableBase::new("test");
        register_cleanup_task(
            &owner,
            cache.clone(),
            Duration::from_millis(20),
            Arc::new(TracingLogger::default()),
        )
        .unwrap();
        assert_eq!(owner.tracked_counts().intervals, 1);

        owner.dispose().unwrap();
        assert_eq!(owner.tracked_counts().intervals, 0);

        cache
            .lock()
            .set("late", "value", Duration::from_millis(10))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        // No sweep ran, so the expired entry is still physically present
        assert_eq!(cache.lock().len(), 1);
    }

    #[test]
    fn test_run_cleanup_on_disposed_cache() {
        let cache = shared_cache();
        cache.lock().dispose();

        assert_eq!(run_cleanup(&cache, &TracingLogger::default()), 0);
    }
}
