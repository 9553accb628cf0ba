//! Logging Module
//!
//! The cache reports lifecycle and error events through an injected
//! [`CacheLogger`] instead of writing to an output stream itself.
//! [`TracingLogger`] forwards to `tracing`; hosts can supply their own.

use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "doc_cache=info";

/// Logging collaborator injected into the cache service.
pub trait CacheLogger: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Forwards log calls to the `tracing` macros, tagged with a component name.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    component: String,
}

impl TracingLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("cache")
    }
}

impl CacheLogger for TracingLogger {
    fn info(&self, message: &str) {
        info!(component = %self.component, "{}", message);
    }

    fn warn(&self, message: &str) {
        warn!(component = %self.component, "{}", message);
    }

    fn error(&self, message: &str) {
        error!(component = %self.component, "{}", message);
    }

    fn debug(&self, message: &str) {
        debug!(component = %self.component, "{}", message);
    }
}

/// Installs the global tracing subscriber with an env filter.
///
/// Defaults to `default_filter`, overridable with the RUST_LOG env var.
/// Returns false if a subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
