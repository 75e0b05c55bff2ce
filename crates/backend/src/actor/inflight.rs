//! Paths with a pipeline currently running.
//!
//! The set has one owner (the watcher). Pipelines hold an [`InFlightGuard`]
//! instead of a reference to the set; dropping the guard queues the path for
//! release, and the owner applies queued releases from its own loop. A
//! pipeline that panics still drops its guard.

use std::{
  collections::HashSet,
  path::{Path, PathBuf},
};

use tokio::sync::mpsc;
use tracing::trace;

#[derive(Debug)]
pub struct InFlightSet {
  paths: HashSet<PathBuf>,
  release_tx: mpsc::UnboundedSender<PathBuf>,
  release_rx: mpsc::UnboundedReceiver<PathBuf>,
}

impl Default for InFlightSet {
  fn default() -> Self {
    Self::new()
  }
}

impl InFlightSet {
  pub fn new() -> Self {
    let (release_tx, release_rx) = mpsc::unbounded_channel();
    Self {
      paths: HashSet::new(),
      release_tx,
      release_rx,
    }
  }

  pub fn contains(&self, path: &Path) -> bool {
    self.paths.contains(path)
  }

  /// Mark a path as in flight. Returns `None` if it already is.
  pub fn claim(&mut self, path: PathBuf) -> Option<InFlightGuard> {
    if !self.paths.insert(path.clone()) {
      return None;
    }
    trace!(file = %path.display(), in_flight = self.paths.len(), "Claimed path");
    Some(InFlightGuard {
      path,
      release_tx: self.release_tx.clone(),
    })
  }

  /// Remove a path, returning whether it was present
  pub fn release(&mut self, path: &Path) -> bool {
    let removed = self.paths.remove(path);
    trace!(file = %path.display(), removed, in_flight = self.paths.len(), "Released path");
    removed
  }

  /// Wait for the next dropped guard and release its path.
  ///
  /// Pending forever while no guard is outstanding, which makes it safe to
  /// poll from a `select!` loop.
  pub async fn settle_next(&mut self) -> Option<PathBuf> {
    let path = self.release_rx.recv().await?;
    self.release(&path);
    Some(path)
  }

  pub fn len(&self) -> usize {
    self.paths.len()
  }

  pub fn is_empty(&self) -> bool {
    self.paths.is_empty()
  }
}

/// Held by a running pipeline; releases its path when dropped
#[derive(Debug)]
pub struct InFlightGuard {
  path: PathBuf,
  release_tx: mpsc::UnboundedSender<PathBuf>,
}

impl InFlightGuard {
  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Drop for InFlightGuard {
  fn drop(&mut self) {
    // The receiver lives in the set; if the set is gone there is nothing to release
    let _ = self.release_tx.send(std::mem::take(&mut self.path));
  }
}
