//! Compact command implementation.

use super::CommandResult;
use rangestream_storage::{FileListStore, ListStore};
use serde::Serialize;
use std::path::Path;

/// Compaction statistics.
#[derive(Debug, Serialize)]
pub struct CompactStats {
    /// Storage directory.
    pub path: String,
    /// Number of non-empty streams.
    pub streams: usize,
    /// Log size before compaction.
    pub bytes_before: u64,
    /// Log size after compaction.
    pub bytes_after: u64,
}

/// Rewrites the operation log at `path` as one record per stream.
///
/// Takes the directory lock, so no backend may have the directory open.
pub fn compact(path: &Path) -> CommandResult<CompactStats> {
    let store = FileListStore::open(path, false, true)?;
    let bytes_before = store.log_size()?;
    store.compact()?;
    let stats = CompactStats {
        path: path.display().to_string(),
        streams: store.keys(usize::MAX)?.len(),
        bytes_before,
        bytes_after: store.log_size()?,
    };
    store.close()?;
    Ok(stats)
}

/// Runs the compact command.
pub fn run(path: &Path, format: &str) -> CommandResult {
    let stats = compact(path)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&stats)?),
        _ => {
            println!("Compacted {}", stats.path);
            println!("  Streams:     {}", stats.streams);
            println!("  Size before: {} bytes", stats.bytes_before);
            println!("  Size after:  {} bytes", stats.bytes_after);
            println!(
                "  Space saved: {} bytes",
                stats.bytes_before.saturating_sub(stats.bytes_after)
            );
        }
    }
    Ok(())
}
