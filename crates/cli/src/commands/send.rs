//! Send command: one-shot upload of a single result file

use std::path::Path;

use anyhow::{Context, Result, bail};
use resbridge::{PipelineOutcome, build_pipeline};
use tracing::{info, warn};

use super::load_config;

/// Upload `file` through the retry pipeline.
///
/// Fails when every attempt failed; the file is left in place then.
pub async fn cmd_send(file: &Path, endpoint: Option<String>, config_path: Option<&Path>, keep: bool) -> Result<()> {
  let config = load_config(config_path, endpoint)?;

  if !file.is_file() {
    bail!("Result file not found: {}", file.display());
  }

  let pipeline = build_pipeline(&config)
    .context("Failed to set up delivery")?
    .keep_files(keep);

  match pipeline.run(file).await {
    PipelineOutcome::Delivered { deleted: true } => {
      info!(file = %file.display(), "Uploaded and deleted");
    }
    PipelineOutcome::Delivered { deleted: false } if keep => {
      info!(file = %file.display(), "Uploaded, file kept");
    }
    PipelineOutcome::Delivered { deleted: false } => {
      warn!(file = %file.display(), "Uploaded, but the file could not be deleted");
    }
    PipelineOutcome::Exhausted { attempts } => {
      bail!("Upload of {} failed after {} attempts", file.display(), attempts);
    }
  }

  Ok(())
}
