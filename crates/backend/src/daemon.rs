//! Daemon lifecycle management.
//!
//! The daemon is the main entry point for the long-running watcher process.
//!
//! # Architecture
//!
//! ```text
//! Daemon (Supervisor)
//!   └── WatcherTask
//!         └── FilePipeline (one task per detected file)
//!               └── RetryController ── DeliveryClient ── ReqwestTransport
//! ```
//!
//! # Lifecycle
//!
//! 1. Validate the endpoint and build the shared HTTP client
//! 2. Create master `CancellationToken`
//! 3. Spawn `WatcherTask` (creates the directory, optional startup scan)
//! 4. Run until ctrl-c or cancellation
//! 5. Stop the watcher; files of interrupted pipelines stay on disk

use std::{path::Path, sync::Arc};

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
  actor::{FilePipeline, WatcherConfig, WatcherError, WatcherTask},
  delivery::{DeliveryClient, ReqwestTransport, RetryConfig, RetryController, TokioDelay},
  domain::config::{Config, ConfigError},
};

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
  #[error(transparent)]
  Config(#[from] ConfigError),
  #[error("Failed to build HTTP client: {0}")]
  Http(#[source] reqwest::Error),
  #[error(transparent)]
  Watcher(#[from] WatcherError),
  #[error("Watcher task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

// ============================================================================
// Configuration
// ============================================================================

/// Daemon runtime configuration.
///
/// Constructed from the config file with CLI overrides already applied.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
  pub config: Config,
}

impl RuntimeConfig {
  /// Load configuration from `explicit` or the default locations
  pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
    Ok(Self {
      config: Config::load(explicit)?,
    })
  }
}

/// Wire the delivery stack for `config`.
///
/// Fails when no usable endpoint is configured.
pub fn build_pipeline(config: &Config) -> Result<FilePipeline, DaemonError> {
  let endpoint = config.delivery.require_endpoint()?;
  let transport = ReqwestTransport::new(config.delivery.request_timeout()).map_err(DaemonError::Http)?;
  let client = DeliveryClient::new(Arc::new(transport), endpoint, config.delivery.wire_fields());
  let retry = RetryController::new(client, RetryConfig::from(&config.retry), Arc::new(TokioDelay));
  Ok(FilePipeline::new(retry))
}

/// The result watcher daemon.
///
/// # Usage
///
/// ```ignore
/// let daemon = Daemon::new(RuntimeConfig::load(None)?);
/// daemon.run().await?;
/// ```
pub struct Daemon {
  runtime_config: RuntimeConfig,
}

impl Daemon {
  pub fn new(runtime_config: RuntimeConfig) -> Self {
    Self { runtime_config }
  }

  /// Run until ctrl-c.
  pub async fn run(self) -> Result<(), DaemonError> {
    let cancel = CancellationToken::new();

    // Handle ctrl-c gracefully
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
      if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        return;
      }
      info!("Received ctrl-c, shutting down...");
      cancel_for_signal.cancel();
    });

    self.run_until(cancel).await
  }

  /// Run until `cancel` fires.
  pub async fn run_until(self, cancel: CancellationToken) -> Result<(), DaemonError> {
    let config = &self.runtime_config.config;
    let pipeline = Arc::new(build_pipeline(config)?);
    let watcher_config = WatcherConfig::from(&config.watch);

    info!("Starting result watcher");
    info!(
      directory = %watcher_config.root.display(),
      extension = %watcher_config.extension,
      endpoint = pipeline.retry().client().endpoint(),
      max_retries = config.retry.max_retries,
      retry_interval_secs = config.retry.retry_interval_secs,
      "Watcher configuration"
    );

    let watcher = WatcherTask::spawn(watcher_config, pipeline, cancel.child_token())?;

    cancel.cancelled().await;
    info!("Shutting down...");

    watcher.await?;

    info!("Daemon shutdown complete");
    Ok(())
  }
}
