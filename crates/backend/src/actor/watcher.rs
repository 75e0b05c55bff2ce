//! WatcherTask - Async directory watcher that feeds the file pipeline
//!
//! This task watches one directory (non-recursively) for result files and
//! starts a [`FilePipeline`] run for every new one.
//!
//! # Design
//!
//! The watcher bridges the sync notify callbacks with the async runtime:
//! 1. notify's sync callback uses `blocking_send` to forward events to a channel
//! 2. The async task consumes events from that channel
//! 3. Each candidate path is checked against the in-flight set and dispatched
//!    to its own spawned task
//! 4. Finished tasks release their path through an [`InFlightGuard`]
//!
//! There is no debouncing: a file is read at dispatch time and re-read on
//! every retry. A partial read that fails to parse is retried, but one that
//! parses (an empty file, or text cut at a line boundary) is uploaded as is
//! and the file is deleted. Instruments are expected to write elsewhere and
//! rename the finished file into the directory.
//!
//! # Lifecycle
//!
//! The watcher runs until:
//! - The `CancellationToken` is triggered
//! - The event channel closes (notify watcher dropped)
//!
//! Pipelines already dispatched are not cancelled by the watcher.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use notify::{
  Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
  event::{CreateKind, ModifyKind},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{
  inflight::{InFlightGuard, InFlightSet},
  pipeline::FilePipeline,
  startup_scan,
};
use crate::domain::config::WatchConfig;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the WatcherTask
#[derive(Debug, Clone)]
pub struct WatcherConfig {
  /// Directory to watch, not recursed into
  pub root: PathBuf,
  /// Suffix a file name must end with, compared case-sensitively
  pub extension: String,
  /// Dispatch matching files already present when the watcher starts
  pub scan_existing: bool,
}

impl From<&WatchConfig> for WatcherConfig {
  fn from(watch: &WatchConfig) -> Self {
    Self {
      root: watch.directory.clone(),
      extension: watch.extension.clone(),
      scan_existing: watch.scan_existing,
    }
  }
}

impl WatcherConfig {
  /// Whether `path` names a result file
  pub fn matches(&self, path: &Path) -> bool {
    path
      .file_name()
      .and_then(|name| name.to_str())
      .is_some_and(|name| name.len() > self.extension.len() && name.ends_with(&self.extension))
  }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur in the watcher
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
  #[error("Failed to create watch directory {dir}: {source}", dir = .path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to initialize watcher: {0}")]
  Init(#[source] notify::Error),

  #[error("Failed to watch path: {0}")]
  Watch(#[source] notify::Error),
}

/// Create the watch directory (and parents) if it does not exist.
///
/// Returns whether it had to be created.
pub fn ensure_directory(path: &Path) -> Result<bool, WatcherError> {
  if path.is_dir() {
    return Ok(false);
  }

  std::fs::create_dir_all(path).map_err(|source| WatcherError::CreateDir {
    path: path.to_path_buf(),
    source,
  })?;
  info!(directory = %path.display(), "Created watch directory");
  Ok(true)
}

// ============================================================================
// WatcherTask
// ============================================================================

/// Async task that watches the result directory
///
/// # Example
///
/// ```ignore
/// let watcher = WatcherTask::new(config, pipeline, cancel_token)?;
/// tokio::spawn(watcher.run());
/// ```
pub struct WatcherTask {
  config: WatcherConfig,
  pipeline: Arc<FilePipeline>,
  cancel: CancellationToken,
  // The notify watcher must be held to keep it alive
  _watcher: RecommendedWatcher,
  // Channel receiving events from notify's sync callback
  event_rx: mpsc::Receiver<Result<Event, notify::Error>>,
  // Paths with a running pipeline; only this task touches the set
  inflight: InFlightSet,
}

impl WatcherTask {
  /// Create a new WatcherTask
  ///
  /// Creates the directory when missing and starts watching it. Events are
  /// not processed until `run()` is called.
  pub fn new(
    config: WatcherConfig,
    pipeline: Arc<FilePipeline>,
    cancel: CancellationToken,
  ) -> Result<Self, WatcherError> {
    info!(root = %config.root.display(), extension = %config.extension, "Initializing file watcher");

    ensure_directory(&config.root)?;

    // The sync callback will use blocking_send, so we need a reasonable buffer
    let (event_tx, event_rx) = mpsc::channel::<Result<Event, notify::Error>>(256);

    let mut watcher = RecommendedWatcher::new(
      move |res| {
        // This runs on notify's thread. If the channel is closed we drop the event
        let _ = event_tx.blocking_send(res);
      },
      notify::Config::default(),
    )
    .map_err(WatcherError::Init)?;

    watcher
      .watch(&config.root, RecursiveMode::NonRecursive)
      .map_err(WatcherError::Watch)?;

    info!(root = %config.root.display(), "File watcher initialized");

    Ok(Self {
      config,
      pipeline,
      cancel,
      _watcher: watcher,
      event_rx,
      inflight: InFlightSet::new(),
    })
  }

  /// Spawn the watcher task and return its join handle
  pub fn spawn(
    config: WatcherConfig,
    pipeline: Arc<FilePipeline>,
    cancel: CancellationToken,
  ) -> Result<tokio::task::JoinHandle<()>, WatcherError> {
    let task = Self::new(config, pipeline, cancel)?;
    Ok(tokio::spawn(task.run()))
  }

  /// Run the watcher task
  ///
  /// This consumes the task and runs until:
  /// - The `CancellationToken` is triggered
  /// - The event channel closes
  pub async fn run(mut self) {
    info!(root = %self.config.root.display(), "WatcherTask started");

    if self.config.scan_existing {
      self.scan_existing().await;
    }

    loop {
      tokio::select! {
          // Check cancellation first (biased)
          biased;

          _ = self.cancel.cancelled() => {
              info!("WatcherTask shutting down (cancelled)");
              break;
          }

          // Apply releases before new events so a finished path can be picked up again
          Some(path) = self.inflight.settle_next() => {
              trace!(file = %path.display(), "Pipeline finished");
          }

          event = self.event_rx.recv() => {
              match event {
                  Some(Ok(event)) => {
                      self.handle_event(event);
                  }
                  Some(Err(e)) => {
                      warn!(error = %e, "Watcher error");
                  }
                  None => {
                      info!("WatcherTask shutting down (channel closed)");
                      break;
                  }
              }
          }
      }
    }

    if !self.inflight.is_empty() {
      info!(
        in_flight = self.inflight.len(),
        "Pipelines still running at shutdown, their files stay on disk if interrupted"
      );
    }

    info!(root = %self.config.root.display(), "WatcherTask stopped");
  }

  /// Dispatch every matching file already present in the directory
  async fn scan_existing(&mut self) {
    match startup_scan::scan(&self.config).await {
      Ok(paths) => {
        info!(count = paths.len(), "Dispatching existing result files");
        for path in paths {
          self.dispatch(path);
        }
      }
      Err(e) => {
        warn!(error = %e, root = %self.config.root.display(), "Startup scan failed");
      }
    }
  }

  /// Filter a notify event down to result files and dispatch them
  pub(crate) fn handle_event(&mut self, event: Event) {
    if !is_arrival(&event.kind) {
      trace!(kind = ?event.kind, "Ignoring event kind");
      return;
    }

    for path in event.paths {
      if self.config.matches(&path) {
        self.dispatch(path);
      }
    }
  }

  /// Start a pipeline for `path` unless one is already running.
  ///
  /// Returns whether a pipeline was started.
  pub(crate) fn dispatch(&mut self, path: PathBuf) -> bool {
    if self.inflight.contains(&path) {
      debug!(file = %path.display(), "Already in flight, ignoring duplicate event");
      return false;
    }

    // Rename events report the old name too; it no longer exists
    if !path.exists() {
      trace!(file = %path.display(), "Path no longer exists, ignoring");
      return false;
    }

    let Some(guard) = self.inflight.claim(path) else {
      return false;
    };

    info!(file = %guard.path().display(), "New result file detected");
    tokio::spawn(run_pipeline(Arc::clone(&self.pipeline), guard));
    true
  }

  /// Wait for the next finished pipeline and release its path
  #[cfg(test)]
  pub(crate) async fn settle_next(&mut self) -> Option<PathBuf> {
    self.inflight.settle_next().await
  }

  #[cfg(test)]
  pub(crate) fn in_flight(&self) -> usize {
    self.inflight.len()
  }
}

/// Body of a spawned pipeline task. The guard is dropped on every exit path,
/// including a panic inside the pipeline.
async fn run_pipeline(pipeline: Arc<FilePipeline>, guard: InFlightGuard) {
  let outcome = pipeline.run(guard.path()).await;
  debug!(file = %guard.path().display(), ?outcome, "Pipeline reached terminal state");
}

/// Creations and renames into the directory announce a new file.
fn is_arrival(kind: &EventKind) -> bool {
  matches!(
    kind,
    EventKind::Create(CreateKind::File | CreateKind::Any | CreateKind::Other) | EventKind::Modify(ModifyKind::Name(_))
  )
}
