//! Removal of result files once the endpoint has confirmed them.

use std::path::{Path, PathBuf};

use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
#[error("Failed to delete {file}: {source}", file = .path.display())]
pub struct DeleteError {
  pub path: PathBuf,
  #[source]
  pub source: std::io::Error,
}

/// Delete a delivered file.
///
/// Only called after a confirmed upload. A failure here is reported and
/// returned but never causes the file to be sent again.
pub async fn finalize(path: &Path) -> Result<(), DeleteError> {
  match tokio::fs::remove_file(path).await {
    Ok(()) => {
      info!(file = %path.display(), "Delivered file deleted");
      Ok(())
    }
    Err(source) => {
      error!(
        file = %path.display(),
        err = %source,
        "Failed to delete delivered file, it stays on disk"
      );
      Err(DeleteError {
        path: path.to_path_buf(),
        source,
      })
    }
  }
}
