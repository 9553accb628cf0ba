//! Best-effort statistics snapshot.
//!
//! Writes a [`StatsRecord`] as JSON into the configured persistence
//! directory. The file is written to a temporary name, flushed and synced,
//! then renamed into place.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{CacheError, Result};
use crate::lifecycle::{with_resource, Release};
use crate::models::StatsRecord;

pub const STATS_FILE_NAME: &str = "cache-stats.json";

/// Open snapshot file; releasing flushes and syncs it to disk.
struct SnapshotFile {
    writer: BufWriter<File>,
}

impl Release for SnapshotFile {
    type Error = io::Error;

    fn release(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }
}

/// Writes `record` to `<dir>/cache-stats.json` and returns the path.
pub fn write_stats(dir: &Path, record: &StatsRecord) -> Result<PathBuf> {
    let path = dir.join(STATS_FILE_NAME);
    let tmp = dir.join(format!("{}.tmp", STATS_FILE_NAME));

    let file = File::create(&tmp).map_err(|e| snapshot_error(&tmp, e))?;
    let snapshot = SnapshotFile {
        writer: BufWriter::new(file),
    };

    with_resource(Some(snapshot), |file| -> io::Result<()> {
        if let Some(file) = file {
            serde_json::to_writer_pretty(&mut file.writer, record)?;
        }
        Ok(())
    })
    .map_err(|e| snapshot_error(&tmp, e))?;

    fs::rename(&tmp, &path).map_err(|e| snapshot_error(&path, e))?;
    Ok(path)
}

/// Reads a previously written snapshot, `None` if there is none.
pub fn read_stats(dir: &Path) -> Result<Option<StatsRecord>> {
    let path = dir.join(STATS_FILE_NAME);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(snapshot_error(&path, e)),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

fn snapshot_error(path: &Path, err: io::Error) -> CacheError {
    CacheError::Snapshot(format!("{}: {}", path.display(), err))
}
