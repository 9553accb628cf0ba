//! Lifecycle Module
//!
//! Resource ownership primitives shared by the cache service:
//! - Scoped acquisition: release on every exit path
//! - Disposable tracking: timers, intervals, listeners and children torn down together

mod disposable;
mod events;
mod scoped;

pub use disposable::{Disposable, DisposableBase, TimerId, TrackedCounts};
pub use events::{EventEmitter, EventHandler, EventSource, ListenerId};
pub use scoped::{with_resource, Release, ScopedResource};
