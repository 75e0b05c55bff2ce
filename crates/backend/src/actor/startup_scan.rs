//! One-shot listing of result files that arrived while nothing was watching.

use std::{io, path::PathBuf};

use tracing::debug;

use super::watcher::WatcherConfig;

/// Matching files directly under the watch root, sorted by path
pub async fn scan(config: &WatcherConfig) -> io::Result<Vec<PathBuf>> {
  let mut entries = tokio::fs::read_dir(&config.root).await?;
  let mut found = Vec::new();

  while let Some(entry) = entries.next_entry().await? {
    let path = entry.path();
    if !config.matches(&path) {
      continue;
    }
    if entry.file_type().await?.is_file() {
      found.push(path);
    }
  }

  found.sort();
  debug!(root = %config.root.display(), count = found.len(), "Scanned for existing result files");
  Ok(found)
}
