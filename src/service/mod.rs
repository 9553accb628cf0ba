//! Cache Service Module
//!
//! The service-level face of the cache: one [`BoundedCache`] behind a lock,
//! a [`DisposableBase`] owning the periodic cleanup sweep and any other
//! background work, error isolation around storage failures, and logging
//! through an injected [`CacheLogger`].

mod snapshot;

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{BoundedCache, CacheOptions, Ttl};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::lifecycle::{
    with_resource, Disposable, DisposableBase, EventHandler, EventSource, ListenerId, Release,
    TimerId,
};
use crate::logging::{CacheLogger, TracingLogger};
use crate::models::{StatsRecord, StatsSnapshot};
use crate::tasks::register_cleanup_task;

pub use snapshot::{read_stats, write_stats, STATS_FILE_NAME};

/// Separator used by [`CacheService::namespaced_key`].
pub const KEY_SEPARATOR: &str = ":";

// == Cache Service ==
/// Shared, disposable cache used by the documentation service.
///
/// All methods take `&self`; share the service across tasks with `Arc`.
/// Cache misses and failed writes are normal outcomes (`Ok(None)` and
/// `Ok(false)`); only use after disposal and setup failures are errors.
pub struct CacheService {
    config: Config,
    cache: Arc<Mutex<BoundedCache>>,
    lifecycle: DisposableBase,
    logger: Arc<dyn CacheLogger>,
    initialized: AtomicBool,
    disposed: AtomicBool,
}

impl CacheService {
    // == Constructor ==
    /// Builds the cache and starts its periodic cleanup sweep.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(config: Config, logger: Arc<dyn CacheLogger>) -> Result<Self> {
        let cache = Arc::new(Mutex::new(BoundedCache::new(CacheOptions::from(&config))));
        let lifecycle = DisposableBase::new("cache-service");

        register_cleanup_task(
            &lifecycle,
            Arc::clone(&cache),
            config.cleanup_period(),
            Arc::clone(&logger),
        )?;

        logger.debug(&format!(
            "Cache service created: max_entries={}, max_memory={}B, default_ttl={}ms, compression={}",
            config.max_entries, config.max_memory_size, config.default_ttl, config.compression
        ));

        Ok(Self {
            config,
            cache,
            lifecycle,
            logger,
            initialized: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        })
    }

    /// Same as [`new`](Self::new) with a [`TracingLogger`].
    pub fn with_tracing(config: Config) -> Result<Self> {
        Self::new(config, Arc::new(TracingLogger::default()))
    }

    // == Initialize ==
    /// Verifies the persistence directory, creating it if needed.
    ///
    /// Idempotent. On failure the service stays un-initialized and the call
    /// can be retried.
    pub async fn initialize(&self) -> Result<()> {
        self.lifecycle.assert_not_disposed()?;
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        if let Some(dir) = &self.config.persistent_path {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                CacheError::Initialization(format!("cannot create {}: {}", dir.display(), e))
            })?;
            let metadata = tokio::fs::metadata(dir).await.map_err(|e| {
                CacheError::Initialization(format!("cannot access {}: {}", dir.display(), e))
            })?;
            if !metadata.is_dir() {
                return Err(CacheError::Initialization(format!(
                    "{} is not a directory",
                    dir.display()
                )));
            }
        }

        self.initialized.store(true, Ordering::Release);
        self.logger.info("Cache service initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    // == Cache Operations ==
    /// Reads a value. Undecodable values are logged and reported as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.lifecycle.assert_not_disposed()?;

        let result = self.cache.lock().get(key);
        match result {
            Err(CacheError::Disposed) => Err(CacheError::Disposed),
            Err(err) => {
                self.logger
                    .warn(&format!("Cache read failed for key '{}': {}", key, err));
                Ok(None)
            }
            ok => ok,
        }
    }

    /// Stores a value. Returns `Ok(false)` when the value could not be
    /// stored; the failure is logged.
    pub fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: impl Into<Ttl>,
    ) -> Result<bool> {
        self.lifecycle.assert_not_disposed()?;

        let result = self.cache.lock().set(key, value, ttl);
        match result {
            Ok(()) => Ok(true),
            Err(err) if err.is_storage_failure() => {
                self.logger
                    .error(&format!("Failed to cache key '{}': {}", key, err));
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    pub fn delete(&self, key: &str) -> Result<bool> {
        self.lifecycle.assert_not_disposed()?;
        self.cache.lock().delete(key)
    }

    pub fn has(&self, key: &str) -> Result<bool> {
        self.lifecycle.assert_not_disposed()?;
        self.cache.lock().has(key)
    }

    pub fn clear(&self) -> Result<()> {
        self.lifecycle.assert_not_disposed()?;
        self.cache.lock().clear()?;
        self.logger.debug("Cache cleared");
        Ok(())
    }

    pub fn stats(&self) -> Result<StatsSnapshot> {
        self.lifecycle.assert_not_disposed()?;
        Ok(self.cache.lock().stats())
    }

    /// Runs one expiry sweep now instead of waiting for the interval.
    pub fn cleanup(&self) -> Result<usize> {
        self.lifecycle.assert_not_disposed()?;
        Ok(crate::tasks::run_cleanup(&self.cache, self.logger.as_ref()))
    }

    /// Returns the cached value or computes, stores and returns it.
    ///
    /// The lock is not held while `compute` runs, so concurrent callers may
    /// compute the same key; the last write wins. Errors from `compute` are
    /// returned and nothing is cached.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: impl Into<Ttl>,
        compute: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let ttl = ttl.into();
        if let Some(cached) = self.get(key)? {
            return Ok(cached);
        }

        let value = compute().await?;
        self.set(key, &value, ttl)?;
        Ok(value)
    }

    // == Key Helpers ==
    /// Builds a key like `docs:react:button`. Empty parts are skipped.
    pub fn namespaced_key(namespace: &str, parts: &[&str]) -> String {
        std::iter::once(namespace)
            .chain(parts.iter().copied())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(KEY_SEPARATOR)
    }

    // == Owned Background Work ==
    /// Schedules a one-shot task owned by this service.
    pub fn set_timeout<F, Fut>(&self, delay: Duration, task: F) -> Result<TimerId>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.lifecycle.set_timeout(delay, task)
    }

    /// Subscribes to an event source for the lifetime of this service.
    pub fn add_event_listener(
        &self,
        subject: Arc<dyn EventSource>,
        event: &str,
        handler: EventHandler,
    ) -> Result<ListenerId> {
        self.lifecycle.add_event_listener(subject, event, handler)
    }

    /// Ties a nested resource's lifetime to this service.
    pub fn add_disposable(&self, child: Arc<dyn Disposable>) -> Result<()> {
        self.lifecycle.add_disposable(child)
    }

    // == Snapshot ==
    /// Writes the current statistics to the persistence directory.
    ///
    /// Returns `Ok(None)` when no `persistent_path` is configured.
    pub async fn snapshot(&self) -> Result<Option<PathBuf>> {
        let Some(dir) = self.config.persistent_path.clone() else {
            return Ok(None);
        };
        let record = StatsRecord::now(self.stats()?);

        let written = tokio::task::spawn_blocking(move || write_stats(&dir, &record))
            .await
            .map_err(|e| CacheError::Snapshot(e.to_string()))
            .and_then(|result| result);

        match written {
            Ok(path) => {
                self.logger
                    .debug(&format!("Wrote cache snapshot to {}", path.display()));
                Ok(Some(path))
            }
            Err(err) => {
                self.logger.warn(&err.to_string());
                Err(err)
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // == Dispose ==
    /// Stops the sweep and all owned work, then disposes the cache.
    ///
    /// Idempotent. Child failures are logged and returned as
    /// [`CacheError::DisposeFailed`] after teardown has finished.
    pub fn dispose(&self) -> Result<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let teardown = CacheTeardown {
            cache: Arc::clone(&self.cache),
        };
        let result = with_resource(Some(teardown), |_| {
            let result = self.lifecycle.dispose();
            if let Err(err) = &result {
                self.logger
                    .error(&format!("Cache service teardown reported failures: {}", err));
            }
            result
        });

        self.logger.info("Cache service disposed");
        result
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

/// Disposes the shared cache when released, on every exit path of teardown.
struct CacheTeardown {
    cache: Arc<Mutex<BoundedCache>>,
}

impl Release for CacheTeardown {
    type Error = CacheError;

    fn release(&mut self) -> Result<()> {
        self.cache.lock().dispose();
        Ok(())
    }
}

impl Disposable for CacheService {
    fn dispose(&self) -> Result<()> {
        CacheService::dispose(self)
    }

    fn is_disposed(&self) -> bool {
        CacheService::is_disposed(self)
    }
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("config", &self.config)
            .field("lifecycle", &self.lifecycle)
            .field("initialized", &self.is_initialized())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
