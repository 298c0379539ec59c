use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A property value as it travels on the wire.
///
/// The wire layer is untyped; a value only acquires meaning through the
/// property's declared type in the device description, so callers narrow it
/// with [`as_f64`](Self::as_f64) / [`as_bool`](Self::as_bool) where they
/// know what to expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl PropertyValue {
    /// Classify a text-protocol value: `true`/`false`, then a finite decimal
    /// number, otherwise the raw string.
    pub fn from_text(raw: &str) -> Self {
        match raw {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => match parse_decimal(raw) {
                Some(n) => Self::Number(n),
                None => Self::Text(raw.to_string()),
            },
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Text(s) => s.parse().ok(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Number(n) => Some(*n != 0.0),
            Self::Text(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Digits with an optional sign, decimal point and exponent. Rejects the
/// `nan`/`inf` spellings `f64::from_str` would also take.
fn parse_decimal(raw: &str) -> Option<f64> {
    let numeric = raw
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if !numeric || !raw.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// A message broadcast by a device, either pushed live or read back from the
/// gateway's message store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceMessage {
    pub timestamp: DateTime<Utc>,
    pub access_id: String,
    pub device_id: String,
    pub message_id: u32,
    pub message: String,
}

/// One historical sample from the gateway's datalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatalogEntry {
    pub timestamp: DateTime<Utc>,
    pub value: PropertyValue,
}
