//! Watch command: run the result watcher in the foreground

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use resbridge::{Daemon, RuntimeConfig};
use tracing::info;

use super::load_config;

/// Watch the result directory until ctrl-c
///
/// # Arguments
/// * `dir` - Directory to watch instead of `watch.directory`
/// * `endpoint` - Endpoint instead of `API` / `delivery.endpoint`
/// * `config_path` - Config file to load instead of the default locations
/// * `scan_existing` - Upload files already present at startup
pub async fn cmd_watch(
  dir: Option<PathBuf>,
  endpoint: Option<String>,
  config_path: Option<&Path>,
  scan_existing: bool,
) -> Result<()> {
  let mut config = load_config(config_path, endpoint)?;
  if let Some(dir) = dir {
    config.watch.directory = dir;
  }
  if scan_existing {
    config.watch.scan_existing = true;
  }

  info!("Starting resbridge {}", env!("CARGO_PKG_VERSION"));
  Daemon::new(RuntimeConfig { config })
    .run()
    .await
    .context("Failed to run watcher")?;

  Ok(())
}
