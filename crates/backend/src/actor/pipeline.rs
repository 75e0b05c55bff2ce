//! Per-file pipeline: deliver with retry, then clean up.

use std::path::Path;

use tracing::info;

use super::lifecycle;
use crate::delivery::RetryController;

/// Terminal state of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
  /// Upload confirmed. `deleted` is false when the file was kept on purpose
  /// or could not be removed.
  Delivered { deleted: bool },
  /// Every attempt failed, the file is untouched
  Exhausted { attempts: u32 },
}

pub struct FilePipeline {
  retry: RetryController,
  keep_files: bool,
}

impl FilePipeline {
  pub fn new(retry: RetryController) -> Self {
    Self {
      retry,
      keep_files: false,
    }
  }

  /// Leave delivered files on disk instead of deleting them
  pub fn keep_files(mut self, keep: bool) -> Self {
    self.keep_files = keep;
    self
  }

  pub fn retry(&self) -> &RetryController {
    &self.retry
  }

  /// Run a file to its terminal state. Never fails; outcomes are logged.
  pub async fn run(&self, path: &Path) -> PipelineOutcome {
    let delivered = match self.retry.send_with_retry(path).await {
      Ok(delivered) => delivered,
      Err(exhausted) => {
        return PipelineOutcome::Exhausted {
          attempts: exhausted.attempts,
        };
      }
    };

    info!(file = %path.display(), status = delivered.status, "File sent");

    if self.keep_files {
      return PipelineOutcome::Delivered { deleted: false };
    }

    let deleted = lifecycle::finalize(path).await.is_ok();
    PipelineOutcome::Delivered { deleted }
  }
}
