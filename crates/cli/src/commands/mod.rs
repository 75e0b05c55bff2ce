//! CLI command implementations

mod config;
mod convert;
mod send;
mod watch;

use std::path::Path;

use anyhow::{Context, Result};
use resbridge::config::Config;

pub use config::{cmd_config_init, cmd_config_show};
pub use convert::cmd_convert;
pub use send::cmd_send;
pub use watch::cmd_watch;

/// Load configuration and apply an `--endpoint` override
fn load_config(path: Option<&Path>, endpoint: Option<String>) -> Result<Config> {
  let mut config = Config::load(path).context("Failed to load configuration")?;
  if let Some(endpoint) = endpoint {
    config.delivery.endpoint = Some(endpoint);
  }
  Ok(config)
}
