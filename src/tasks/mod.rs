//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache service is alive.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired cache entries at configured intervals

mod cleanup;

pub use cleanup::{register_cleanup_task, run_cleanup};
