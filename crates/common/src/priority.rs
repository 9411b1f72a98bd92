//! Priority normalisation
//!
//! Upstream records carry `priority` as a number, a numeric string (often
//! padded with whitespace), an empty string, `null`, or nothing at all.
//! Everything that orders or aggregates records goes through
//! [`parse_priority`], and the record model stores the parsed value as a
//! [`Priority`] so the raw union never travels past deserialization.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Normalise a raw JSON priority into a finite rank.
///
/// `null`, `""`, booleans, arrays and objects yield `0`. Strings are trimmed
/// and parsed from their longest numeric prefix, so `"  12.5 "` is `12.5`
/// and `"abc"` is `0`. Non-finite results also collapse to `0`.
pub fn parse_priority(raw: &Value) -> f64 {
    match raw {
        Value::Number(n) => finite_or_zero(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => parse_priority_str(s),
        _ => 0.0,
    }
}

/// String form of [`parse_priority`].
pub fn parse_priority_str(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let prefix = numeric_prefix(trimmed);
    if prefix.is_empty() {
        return 0.0;
    }

    prefix.parse::<f64>().map(finite_or_zero).unwrap_or(0.0)
}

fn finite_or_zero(v: f64) -> f64 {
    // -0.0 folds into 0.0 so ordering by total_cmp stays consistent with ==
    if v.is_finite() && v != 0.0 {
        v
    } else {
        0.0
    }
}

/// Longest prefix of `s` that forms a decimal float literal:
/// `[+-]? digits? (. digits?)? ([eE] [+-]? digits)?` with at least one
/// mantissa digit.
fn numeric_prefix(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut i = 0;

    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut mantissa_digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        let frac_digits = j - frac_start;
        if mantissa_digits + frac_digits > 0 {
            mantissa_digits += frac_digits;
            i = j;
        }
    }

    if mantissa_digits == 0 {
        return "";
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    &s[..i]
}

/// A parsed, always-finite priority rank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Priority(f64);

impl Priority {
    pub const ZERO: Priority = Priority(0.0);

    pub fn new(value: f64) -> Self {
        Priority(finite_or_zero(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Eq for Priority {}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for Priority {
    fn from(value: f64) -> Self {
        Priority::new(value)
    }
}

impl From<&Value> for Priority {
    fn from(raw: &Value) -> Self {
        Priority(parse_priority(raw))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(Priority::from(&raw))
    }
}
