//! Persisted sample model
//!
//! A `Sample` is one stored capture: timestamp, mood label, GPS fix and an
//! optional reference to a recorded video clip. The export pipeline never
//! writes samples; it only reads and projects them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single stored column value, kept in the storage class it was written with
///
/// Ids, timestamps and coordinates are loosely typed in the sample store
/// (a latitude may be a REAL or numeric-looking TEXT), so they are carried
/// as-is and only interpreted at projection time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl StoredValue {
    /// Numeric interpretation of the value
    ///
    /// Text is accepted when it parses as a float after trimming whitespace.
    /// Returns `None` for text that is not numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StoredValue::Integer(v) => Some(*v as f64),
            StoredValue::Real(v) => Some(*v),
            StoredValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

impl fmt::Display for StoredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredValue::Integer(v) => write!(f, "{}", v),
            StoredValue::Real(v) => write!(f, "{}", v),
            StoredValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for StoredValue {
    fn from(s: &str) -> Self {
        StoredValue::Text(s.to_string())
    }
}

impl From<String> for StoredValue {
    fn from(s: String) -> Self {
        StoredValue::Text(s)
    }
}

impl From<i64> for StoredValue {
    fn from(v: i64) -> Self {
        StoredValue::Integer(v)
    }
}

impl From<f64> for StoredValue {
    fn from(v: f64) -> Self {
        StoredValue::Real(v)
    }
}

/// Stored sample record
///
/// Every field is optional. The media reference has been persisted under
/// `video_filename` and `videoname` in older data; both are read as aliases
/// of `media_filename`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(default)]
    pub id: Option<StoredValue>,
    #[serde(default)]
    pub ts: Option<StoredValue>,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub lat: Option<StoredValue>,
    #[serde(default)]
    pub lng: Option<StoredValue>,
    #[serde(default, alias = "video_filename", alias = "videoname")]
    pub media_filename: Option<String>,
}

impl Sample {
    /// Media reference, treating an empty string as absent
    pub fn media_filename(&self) -> Option<&str> {
        self.media_filename
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }
}
