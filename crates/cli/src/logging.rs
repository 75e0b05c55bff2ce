//! Logging utilities for CLI commands and the watcher

use std::path::{Path, PathBuf};

use resbridge::config::{Config, DaemonConfig};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Get the resbridge data directory (respects env vars)
pub fn data_dir() -> PathBuf {
  resbridge::dirs::default_data_dir()
}

/// Initialize logging for CLI commands (console only, stderr so stdout stays clean)
pub fn init_cli_logging() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into()))
    .with_writer(std::io::stderr)
    .init();
}

/// Parse log level from config string
fn parse_log_level(level: &str) -> LevelFilter {
  match level.to_lowercase().as_str() {
    "off" => LevelFilter::OFF,
    "error" => LevelFilter::ERROR,
    "warn" => LevelFilter::WARN,
    "info" => LevelFilter::INFO,
    "debug" => LevelFilter::DEBUG,
    "trace" => LevelFilter::TRACE,
    _ => LevelFilter::INFO,
  }
}

/// Initialize logging for the watcher with config-driven settings.
///
/// Always logs to the console with colors. With `log_to_file` set, also logs
/// to a rolling file in the data directory (no ANSI).
///
/// Returns the guard that must be kept alive for the duration of the program
pub fn init_daemon_logging(config_path: Option<&Path>) -> Option<WorkerGuard> {
  // A broken config is reported by the command itself; log with defaults meanwhile
  let daemon_config = Config::load(config_path).map(|c| c.daemon).unwrap_or_default();
  init_daemon_logging_with_config(&daemon_config)
}

fn init_daemon_logging_with_config(daemon_config: &DaemonConfig) -> Option<WorkerGuard> {
  let level = parse_log_level(&daemon_config.log_level);

  // Build env filter (allows RUST_LOG override)
  let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

  let console = fmt::layer().with_target(true).with_ansi(true);

  if !daemon_config.log_to_file {
    tracing_subscriber::registry().with(env_filter).with(console).init();
    return None;
  }

  let log_dir = data_dir();
  if let Err(e) = std::fs::create_dir_all(&log_dir) {
    tracing_subscriber::registry().with(env_filter).with(console).init();
    tracing::warn!(dir = %log_dir.display(), error = %e, "Cannot create log directory, logging to console only");
    return None;
  }

  // Create rolling file appender based on config
  let file_appender = match daemon_config.log_rotation.as_str() {
    "hourly" => tracing_appender::rolling::hourly(&log_dir, "resbridge.log"),
    "never" => tracing_appender::rolling::never(&log_dir, "resbridge.log"),
    _ => tracing_appender::rolling::daily(&log_dir, "resbridge.log"),
  };

  let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

  tracing_subscriber::registry()
    .with(env_filter)
    .with(console)
    .with(
      fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .with_writer(file_writer),
    )
    .init();

  Some(guard)
}
