//! Parsed instrument records.
//!
//! A [`Record`] is one data line of a `.RES` file: the sample id, the run date
//! and the measurements found on the line, in the order they appear.

use std::{borrow::Borrow, fmt};

use indexmap::IndexMap;
use serde::{Serialize, Serializer, ser::SerializeMap};

/// Key of one measurement: `"<name> (<unit>)"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeasurementKey(String);

impl MeasurementKey {
  pub fn new(name: &str, unit: &str) -> Self {
    Self(format!("{} ({})", name, unit))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

// Hash and Eq are derived from the inner string, so lookups by `&str` agree
impl Borrow<str> for MeasurementKey {
  fn borrow(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for MeasurementKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl Serialize for MeasurementKey {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.0)
  }
}

/// A measurement value after its precision rule has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattedValue {
  /// Decimal text with a comma separator, e.g. `"12,3"` or `"NaN"`
  Text(String),
  /// Rounded integer, sent as a JSON number
  Integer(i64),
  /// Integer rule applied to something that is not a finite number
  Missing,
}

impl FormattedValue {
  pub fn text(value: impl Into<String>) -> Self {
    Self::Text(value.into())
  }
}

impl fmt::Display for FormattedValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FormattedValue::Text(text) => f.write_str(text),
      FormattedValue::Integer(value) => write!(f, "{}", value),
      FormattedValue::Missing => f.write_str("null"),
    }
  }
}

impl Serialize for FormattedValue {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      FormattedValue::Text(text) => serializer.serialize_str(text),
      FormattedValue::Integer(value) => serializer.serialize_i64(*value),
      FormattedValue::Missing => serializer.serialize_none(),
    }
  }
}

/// Ordered measurements of one record.
///
/// Iteration follows first insertion. Inserting a key that is already present
/// replaces its value but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Measurements(IndexMap<MeasurementKey, FormattedValue>);

impl Measurements {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert a value, returning the one it replaced
  pub fn insert(&mut self, key: MeasurementKey, value: FormattedValue) -> Option<FormattedValue> {
    self.0.insert(key, value)
  }

  pub fn get(&self, key: &str) -> Option<&FormattedValue> {
    self.0.get(key)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&MeasurementKey, &FormattedValue)> {
    self.0.iter()
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(MeasurementKey::as_str)
  }
}

impl FromIterator<(MeasurementKey, FormattedValue)> for Measurements {
  fn from_iter<I: IntoIterator<Item = (MeasurementKey, FormattedValue)>>(iter: I) -> Self {
    let mut measurements = Self::new();
    for (key, value) in iter {
      measurements.insert(key, value);
    }
    measurements
  }
}

/// One parsed data line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
  pub sample_id: String,
  pub date: String,
  pub measurements: Measurements,
}

impl Record {
  /// View this record as the flat JSON object the endpoint receives
  pub fn wire<'a>(&'a self, fields: &'a WireFields) -> WireRecord<'a> {
    WireRecord { record: self, fields }
  }
}

// ============================================================================
// Wire format
// ============================================================================

/// Labels of the fixed fields in the uploaded JSON objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFields {
  pub sample_id: String,
  pub date: String,
}

impl Default for WireFields {
  fn default() -> Self {
    Self {
      sample_id: "ID muestr".to_string(),
      date: "Fecha".to_string(),
    }
  }
}

#[derive(Debug, Clone, Copy)]
enum WireValue<'a> {
  Str(&'a str),
  Value(&'a FormattedValue),
}

impl Serialize for WireValue<'_> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      WireValue::Str(s) => serializer.serialize_str(s),
      WireValue::Value(v) => v.serialize(serializer),
    }
  }
}

/// Flat JSON view of a [`Record`]: sample id, date, then each measurement.
///
/// A measurement whose key equals one of the fixed labels overwrites that
/// field's value without moving it.
pub struct WireRecord<'a> {
  record: &'a Record,
  fields: &'a WireFields,
}

impl Serialize for WireRecord<'_> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut entries: IndexMap<&str, WireValue<'_>> = IndexMap::with_capacity(self.record.measurements.len() + 2);
    entries.insert(&self.fields.sample_id, WireValue::Str(&self.record.sample_id));
    entries.insert(&self.fields.date, WireValue::Str(&self.record.date));
    for (key, value) in self.record.measurements.iter() {
      entries.insert(key.as_str(), WireValue::Value(value));
    }

    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (key, value) in &entries {
      map.serialize_entry(key, value)?;
    }
    map.end()
  }
}

/// Serialize records as the pretty-printed JSON array sent to the endpoint
pub fn to_wire_json(records: &[Record], fields: &WireFields) -> Result<Vec<u8>, serde_json::Error> {
  let wire: Vec<WireRecord<'_>> = records.iter().map(|r| r.wire(fields)).collect();
  serde_json::to_vec_pretty(&wire)
}
