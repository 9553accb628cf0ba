//! Data Models Module
//!
//! Serializable views of cache state handed to callers and written to disk.

mod snapshot;

pub use snapshot::{StatsRecord, StatsSnapshot};
