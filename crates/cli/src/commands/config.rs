//! Configuration commands

use std::path::Path;

use anyhow::{Context, Result, bail};
use resbridge::config::{Config, LOCAL_CONFIG_FILE};

/// Show the effective configuration
pub async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
  let config = Config::load(config_path).context("Failed to load configuration")?;

  match config_path.map(Path::to_path_buf).or_else(Config::discover) {
    Some(path) => println!("Using config: {}", path.display()),
    None => println!("Using default configuration (no config file found)"),
  }
  println!();

  // Show config as TOML
  let toml_str = toml::to_string_pretty(&config)?;
  println!("{}", toml_str);

  Ok(())
}

/// Write a commented default config into the working directory
pub async fn cmd_config_init(force: bool) -> Result<()> {
  let config_path = Path::new(LOCAL_CONFIG_FILE);

  if config_path.exists() && !force {
    bail!(
      "Config file already exists: {} (use --force to overwrite)",
      config_path.display()
    );
  }

  std::fs::write(config_path, Config::generate_template())
    .with_context(|| format!("Failed to write {}", config_path.display()))?;

  println!("Created config: {}", config_path.display());
  println!("Set delivery.endpoint (or the API environment variable) before running `resbridge watch`.");

  Ok(())
}
