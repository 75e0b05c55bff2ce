//! `.RES` file parser.
//!
//! Result files are semicolon-delimited, one sample per line:
//!
//! ```text
//! S1;;;;;;2024-01-01;;;;FOS;12,3;mg/dL;GLU;99,6;mg/dL
//! ^0         ^6          ^10 name/value/unit triples...
//! ```
//!
//! Field 0 is the sample id, field 6 the date, and from field 10 on the line
//! holds `(name, value, unit)` triples. Lines starting with `;` are comments.

mod precision;

use tracing::trace;

pub use precision::{FormatRule, parse_number};

use crate::domain::record::{MeasurementKey, Measurements, Record};

const FIELD_SEPARATOR: char = ';';
const COMMENT_MARKER: char = ';';

const SAMPLE_ID_FIELD: usize = 0;
const DATE_FIELD: usize = 6;
const FIRST_MEASUREMENT_FIELD: usize = 10;
const TRIPLE_WIDTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
  #[error("line {line}: expected at least {required} fields, found {found}")]
  TooFewFields { line: usize, found: usize, required: usize },
}

/// Parse the full text of a result file.
///
/// Blank and comment lines are skipped. Every other line yields one
/// [`Record`], even if none of its triples are complete. Fails only when a
/// data line is too short to carry a sample id and date.
pub fn parse(text: &str) -> Result<Vec<Record>, ParseError> {
  let mut records = Vec::new();

  for (index, line) in text.split('\n').enumerate() {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
      continue;
    }
    records.push(parse_line(line, index + 1)?);
  }

  Ok(records)
}

fn parse_line(line: &str, line_number: usize) -> Result<Record, ParseError> {
  let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();

  if fields.len() <= DATE_FIELD {
    return Err(ParseError::TooFewFields {
      line: line_number,
      found: fields.len(),
      required: DATE_FIELD + 1,
    });
  }

  let mut measurements = Measurements::new();
  for start in (FIRST_MEASUREMENT_FIELD..fields.len()).step_by(TRIPLE_WIDTH) {
    let Some(triple) = fields.get(start..start + TRIPLE_WIDTH) else {
      trace!(line = line_number, field = start, "Skipping truncated measurement");
      continue;
    };

    let (name, value, unit) = (triple[0].trim(), triple[1].trim(), triple[2].trim());
    if name.is_empty() || value.is_empty() || unit.is_empty() {
      continue;
    }

    let formatted = FormatRule::for_name(name).format(value);
    measurements.insert(MeasurementKey::new(name, unit), formatted);
  }

  Ok(Record {
    sample_id: fields[SAMPLE_ID_FIELD].trim().to_string(),
    date: fields[DATE_FIELD].trim().to_string(),
    measurements,
  })
}
