//! Configuration system for resbridge.
//!
//! Config priority: explicit path > ./resbridge.toml > user (~/.config/resbridge/config.toml) > defaults.
//! The `API` environment variable overrides `delivery.endpoint`.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::record::WireFields;
use crate::dirs;

/// Environment variable holding the upload endpoint
pub const ENDPOINT_ENV: &str = "API";

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "resbridge.toml";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Failed to read config {file}: {source}", file = .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to parse config {file}: {source}", file = .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
  #[error("No upload endpoint configured (set delivery.endpoint or the API environment variable)")]
  MissingEndpoint,
  #[error("Invalid upload endpoint {0:?}: expected an http:// or https:// URL")]
  InvalidEndpoint(String),
}

// ============================================================================
// Watch Configuration
// ============================================================================

/// Directory watcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
  /// Directory the instrument writes result files into (created if missing)
  pub directory: PathBuf,

  /// File name suffix of result files (case-sensitive)
  pub extension: String,

  /// Also process matching files already present when the watcher starts
  pub scan_existing: bool,
}

impl Default for WatchConfig {
  fn default() -> Self {
    Self {
      directory: dirs::default_watch_dir(),
      extension: ".RES".to_string(),
      scan_existing: false,
    }
  }
}

// ============================================================================
// Delivery Configuration
// ============================================================================

/// Upload endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
  /// Endpoint receiving the JSON array of records (POST)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub endpoint: Option<String>,

  /// Per-request timeout in seconds
  pub request_timeout_secs: u64,

  /// JSON label of the sample id field
  pub sample_id_field: String,

  /// JSON label of the date field
  pub date_field: String,
}

impl Default for DeliveryConfig {
  fn default() -> Self {
    let fields = WireFields::default();
    Self {
      endpoint: None,
      request_timeout_secs: 30,
      sample_id_field: fields.sample_id,
      date_field: fields.date,
    }
  }
}

impl DeliveryConfig {
  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }

  pub fn wire_fields(&self) -> WireFields {
    WireFields {
      sample_id: self.sample_id_field.clone(),
      date: self.date_field.clone(),
    }
  }

  /// The configured endpoint, checked to be an http(s) URL
  pub fn require_endpoint(&self) -> Result<&str, ConfigError> {
    let endpoint = self
      .endpoint
      .as_deref()
      .map(str::trim)
      .filter(|e| !e.is_empty())
      .ok_or(ConfigError::MissingEndpoint)?;

    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
      return Err(ConfigError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(endpoint)
  }
}

// ============================================================================
// Retry Configuration
// ============================================================================

/// Redelivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
  /// Attempts after the first one
  pub max_retries: u32,

  /// Fixed wait between attempts in seconds
  pub retry_interval_secs: u64,
}

impl Default for RetrySettings {
  fn default() -> Self {
    Self {
      max_retries: 5,
      retry_interval_secs: 60,
    }
  }
}

// ============================================================================
// Daemon Configuration
// ============================================================================

/// Process-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
  /// Log level: "off", "error", "warn", "info", "debug", "trace"
  /// Default: "info"
  #[serde(default = "default_log_level")]
  pub log_level: String,

  /// Write logs to a rolling file in the data directory instead of the console
  pub log_to_file: bool,

  /// Log file rotation: "daily", "hourly", "never"
  /// Default: "daily"
  #[serde(default = "default_log_rotation")]
  pub log_rotation: String,
}

fn default_log_level() -> String {
  "info".to_string()
}
fn default_log_rotation() -> String {
  "daily".to_string()
}

impl Default for DaemonConfig {
  fn default() -> Self {
    Self {
      log_level: default_log_level(),
      log_to_file: false,
      log_rotation: default_log_rotation(),
    }
  }
}

// ============================================================================
// Main Configuration
// ============================================================================

/// resbridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Directory watcher settings
  #[serde(default)]
  pub watch: WatchConfig,

  /// Upload endpoint settings
  #[serde(default)]
  pub delivery: DeliveryConfig,

  /// Redelivery settings
  #[serde(default)]
  pub retry: RetrySettings,

  /// Logging settings
  #[serde(default)]
  pub daemon: DaemonConfig,
}

impl Config {
  /// Load the effective configuration.
  ///
  /// An explicit path must exist and parse. Implicit locations are skipped
  /// when absent. Environment overrides are applied last.
  pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
    let mut config = match explicit {
      Some(path) => Self::from_file(path)?,
      None => match Self::discover() {
        Some(path) => Self::from_file(&path)?,
        None => {
          debug!("No config file found, using defaults");
          Self::default()
        }
      },
    };

    config.apply_endpoint_override(std::env::var(ENDPOINT_ENV).ok());
    Ok(config)
  }

  /// Parse a config file
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    debug!(path = %path.display(), "Loaded config file");
    Ok(config)
  }

  /// First existing implicit config file
  pub fn discover() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
      return Some(local);
    }

    Self::user_config_path().filter(|path| path.exists())
  }

  /// Get the user-level config path
  pub fn user_config_path() -> Option<PathBuf> {
    Some(dirs::default_config_dir().join("config.toml"))
  }

  /// Replace `delivery.endpoint` with the value of the `API` variable.
  /// Unset and blank values leave the configured endpoint alone.
  fn apply_endpoint_override(&mut self, value: Option<String>) {
    if let Some(endpoint) = value
      && !endpoint.trim().is_empty()
    {
      debug!("{} found in environment", ENDPOINT_ENV);
      self.delivery.endpoint = Some(endpoint);
    }
  }

  /// Generate a default config file as a string
  pub fn generate_template() -> String {
    let defaults = Self::default();
    let directory = toml::Value::String(defaults.watch.directory.display().to_string());

    format!(
      r#"# resbridge configuration
# Place in ./{LOCAL_CONFIG_FILE} or ~/.config/resbridge/config.toml

# ============================================================================
# Watcher
# ============================================================================

[watch]
# Directory the instrument writes result files into (created if missing)
directory = {directory}

# Only files whose name ends with this suffix are processed (case-sensitive)
extension = "{extension}"

# Also send files already in the directory when the watcher starts
scan_existing = false

# ============================================================================
# Delivery
# ============================================================================

[delivery]
# Endpoint receiving a JSON array of records (POST, application/json)
# Can also be set via the {ENDPOINT_ENV} env var
# endpoint = "https://lab.example.com/api/results"

# Per-request timeout in seconds
request_timeout_secs = {timeout}

# Labels of the fixed fields in each uploaded object
sample_id_field = "{sample_id}"
date_field = "{date}"

# ============================================================================
# Retry
# ============================================================================

[retry]
# Attempts after the first one; files are left on disk once exhausted
max_retries = {max_retries}

# Fixed wait between attempts in seconds
retry_interval_secs = {interval}

# ============================================================================
# Logging
# ============================================================================

[daemon]
# off, error, warn, info, debug, trace (RUST_LOG overrides)
log_level = "info"

# Write logs to a rolling file in the data directory
log_to_file = false

# daily, hourly, never
log_rotation = "daily"
"#,
      extension = defaults.watch.extension,
      timeout = defaults.delivery.request_timeout_secs,
      sample_id = defaults.delivery.sample_id_field,
      date = defaults.delivery.date_field,
      max_retries = defaults.retry.max_retries,
      interval = defaults.retry.retry_interval_secs,
    )
  }
}
