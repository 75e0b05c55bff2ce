//! Measurement formatting rules.
//!
//! The analyser reports most analytes as whole numbers. A few are shown with a
//! fixed number of decimals, and creatinine keeps whatever precision the
//! instrument wrote. Decimals are displayed with a comma.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

use crate::domain::record::FormattedValue;

/// Analytes rendered with a fixed number of fractional digits
const ROUNDED_FIXED: &[(&str, u32)] = &[("FOS", 1), ("CA As", 1), ("ALB", 2), ("PT", 2)];

/// Analytes rendered with their own precision
const PLAIN_DECIMAL: &[&str] = &["CRE L"];

const NOT_A_NUMBER: &str = "NaN";

/// How a measurement value is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatRule {
  /// Round half away from zero to `digits` decimals and pad with zeros
  RoundedFixed { digits: u32 },
  /// Shortest decimal form, trailing zeros dropped
  PlainDecimal,
  /// Round half away from zero to a whole number
  Integer,
}

impl FormatRule {
  /// Rule for a trimmed measurement name (exact match)
  pub fn for_name(name: &str) -> Self {
    if let Some((_, digits)) = ROUNDED_FIXED.iter().find(|(n, _)| *n == name) {
      return FormatRule::RoundedFixed { digits: *digits };
    }
    if PLAIN_DECIMAL.contains(&name) {
      return FormatRule::PlainDecimal;
    }
    FormatRule::Integer
  }

  /// Apply the rule to a raw field value
  pub fn format(self, raw: &str) -> FormattedValue {
    let number = parse_number(raw);
    match self {
      FormatRule::RoundedFixed { digits } => text_or_nan(number.map(|n| render_fixed(n, digits))),
      FormatRule::PlainDecimal => text_or_nan(number.map(render_plain)),
      FormatRule::Integer => number
        .and_then(round_integer)
        .map_or(FormattedValue::Missing, FormattedValue::Integer),
    }
  }
}

/// Parse a field value, accepting `,` or `.` as the decimal separator
pub fn parse_number(raw: &str) -> Option<Decimal> {
  let normalized = raw.trim().replacen(',', ".", 1);
  Decimal::from_str(&normalized)
    .or_else(|_| Decimal::from_scientific(&normalized))
    .ok()
}

fn render_fixed(value: Decimal, digits: u32) -> String {
  let mut rounded = value.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);
  rounded.rescale(digits);
  rounded.to_string()
}

fn render_plain(value: Decimal) -> String {
  value.normalize().to_string()
}

fn round_integer(value: Decimal) -> Option<i64> {
  value
    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    .to_i64()
}

fn text_or_nan(rendered: Option<String>) -> FormattedValue {
  match rendered {
    Some(text) => FormattedValue::Text(localize(&text)),
    None => FormattedValue::text(NOT_A_NUMBER),
  }
}

/// Swap the decimal point for the display separator
fn localize(rendered: &str) -> String {
  rendered.replace('.', ",")
}
