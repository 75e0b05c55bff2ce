//! Convert command: show what a result file would be uploaded as

use std::path::Path;

use anyhow::{Context, Result};
use resbridge::{
  config::Config,
  parser,
  record::{WireRecord, to_wire_json},
};

/// Parse `file` and print the request body, without sending or deleting
pub async fn cmd_convert(file: &Path, compact: bool, config_path: Option<&Path>) -> Result<()> {
  let config = Config::load(config_path).context("Failed to load configuration")?;
  let fields = config.delivery.wire_fields();

  let text = tokio::fs::read_to_string(file)
    .await
    .with_context(|| format!("Failed to read {}", file.display()))?;
  let records = parser::parse(&text).with_context(|| format!("Failed to parse {}", file.display()))?;

  let json = if compact {
    let wire: Vec<WireRecord<'_>> = records.iter().map(|r| r.wire(&fields)).collect();
    serde_json::to_string(&wire)?
  } else {
    String::from_utf8(to_wire_json(&records, &fields)?)?
  };

  println!("{}", json);
  eprintln!("{} record(s) from {}", records.len(), file.display());

  Ok(())
}
