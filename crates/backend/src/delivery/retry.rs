//! Fixed-interval redelivery of one result file
//!
//! Every attempt starts from disk: read -> parse -> deliver. A file that was
//! still being written and failed to parse on one attempt is read again on
//! the next. Waits go through `Delay` so tests never sleep.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::{Delivered, DeliveryClient, DeliveryError};
use crate::{
  domain::config::RetrySettings,
  parser::{self, ParseError},
};

/// Configuration for redelivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
  /// Attempts after the first one
  pub max_retries: u32,
  /// Wait between two attempts
  pub retry_interval: Duration,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_retries: 5,
      retry_interval: Duration::from_secs(60),
    }
  }
}

impl From<&RetrySettings> for RetryConfig {
  fn from(settings: &RetrySettings) -> Self {
    Self {
      max_retries: settings.max_retries,
      retry_interval: Duration::from_secs(settings.retry_interval_secs),
    }
  }
}

impl RetryConfig {
  pub fn total_attempts(&self) -> u32 {
    self.max_retries + 1
  }

  /// State following a finished attempt (1-based)
  pub fn after_attempt(&self, attempt: u32, result: Result<Delivered, AttemptError>) -> RetryState {
    match result {
      Ok(delivered) => RetryState::Success { attempt, delivered },
      Err(error) if attempt <= self.max_retries => RetryState::SchedulingRetry { attempt, error },
      Err(error) => RetryState::Exhausted {
        attempts: attempt,
        error,
      },
    }
  }
}

/// Waits between attempts
#[async_trait]
pub trait Delay: Send + Sync {
  async fn wait(&self, duration: Duration);
}

/// [`Delay`] on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
  async fn wait(&self, duration: Duration) {
    tokio::time::sleep(duration).await;
  }
}

// ============================================================================
// Errors
// ============================================================================

/// Why a single attempt failed
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
  #[error("Failed to read {file}: {source}", file = .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Malformed result file: {0}")]
  Parse(#[from] ParseError),
  #[error("Upload failed: {0}")]
  Delivery(#[from] DeliveryError),
}

/// Every attempt failed; the file stays where it is
#[derive(Debug, thiserror::Error)]
#[error("Gave up on {file} after {attempts} attempts: {last_error}", file = .path.display())]
pub struct ExhaustedError {
  pub path: PathBuf,
  pub attempts: u32,
  #[source]
  pub last_error: AttemptError,
}

// ============================================================================
// State machine
// ============================================================================

/// Redelivery progress of one file. `Success` and `Exhausted` are terminal.
#[derive(Debug)]
pub enum RetryState {
  Attempting { attempt: u32 },
  SchedulingRetry { attempt: u32, error: AttemptError },
  Success { attempt: u32, delivered: Delivered },
  Exhausted { attempts: u32, error: AttemptError },
}

impl RetryState {
  pub fn is_terminal(&self) -> bool {
    matches!(self, RetryState::Success { .. } | RetryState::Exhausted { .. })
  }
}

// ============================================================================
// Controller
// ============================================================================

pub struct RetryController {
  client: DeliveryClient,
  config: RetryConfig,
  delay: Arc<dyn Delay>,
}

impl RetryController {
  pub fn new(client: DeliveryClient, config: RetryConfig, delay: Arc<dyn Delay>) -> Self {
    Self { client, config, delay }
  }

  pub fn config(&self) -> &RetryConfig {
    &self.config
  }

  pub fn client(&self) -> &DeliveryClient {
    &self.client
  }

  /// One read -> parse -> deliver pass
  pub async fn attempt(&self, path: &Path) -> Result<Delivered, AttemptError> {
    let text = tokio::fs::read_to_string(path).await.map_err(|source| AttemptError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    let records = parser::parse(&text)?;
    debug!(file = %path.display(), records = records.len(), "Parsed result file");

    Ok(self.client.deliver(&records).await?)
  }

  /// Deliver a file, retrying at a fixed interval until success or exhaustion
  pub async fn send_with_retry(&self, path: &Path) -> Result<Delivered, ExhaustedError> {
    let file = path.display();
    let mut state = RetryState::Attempting { attempt: 1 };

    loop {
      state = match state {
        RetryState::Attempting { attempt } => {
          let result = self.attempt(path).await;
          self.config.after_attempt(attempt, result)
        }
        RetryState::SchedulingRetry { attempt, error } => {
          warn!(
            file = %file,
            retry = attempt,
            max_retries = self.config.max_retries,
            retry_in_secs = self.config.retry_interval.as_secs(),
            err = %error,
            "Upload failed, retry scheduled"
          );
          self.delay.wait(self.config.retry_interval).await;
          RetryState::Attempting { attempt: attempt + 1 }
        }
        RetryState::Success { attempt, delivered } => {
          if attempt > 1 {
            info!(file = %file, attempt, "Upload succeeded after retry");
          }
          return Ok(delivered);
        }
        RetryState::Exhausted { attempts, error } => {
          error!(
            file = %file,
            attempts,
            err = %error,
            "All retries exhausted, file left in place"
          );
          return Err(ExhaustedError {
            path: path.to_path_buf(),
            attempts,
            last_error: error,
          });
        }
      };
    }
  }
}
