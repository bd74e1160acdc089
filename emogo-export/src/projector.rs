//! Export projection
//!
//! Pure transformations from stored samples into the view shapes used by the
//! three export surfaces. No I/O happens here.
//!
//! - JSON fan-out: `vlogs` (samples with media only), `sentiments` and `gps`
//!   (every sample, raw values)
//! - Tabular rows: display timestamp, coordinates rounded to 4 decimals,
//!   relative media link
//!
//! Input order is preserved in every output; nothing is re-sorted.

use chrono::{DateTime, NaiveDateTime};
use emogo_common::{Sample, StoredValue};
use serde::Serialize;

use crate::error::{ExportError, ExportResult};

/// Public path prefix the media directory is mounted at
pub const MEDIA_PATH_PREFIX: &str = "/videos";

/// Timestamp display format (no fractional seconds, no zone)
pub const TIMESTAMP_DISPLAY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Zone-less layouts accepted for stored timestamps
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Zoned layouts accepted for stored timestamps (besides RFC 3339)
const ZONED_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
];

/// Sample with a recorded clip, as listed in the JSON export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VlogEntry {
    pub id: Option<StoredValue>,
    pub ts: Option<StoredValue>,
    pub video_filename: String,
    pub video_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentEntry {
    pub id: Option<StoredValue>,
    pub ts: Option<StoredValue>,
    pub mood: Option<String>,
}

/// GPS fix with coordinates exactly as stored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpsEntry {
    pub id: Option<StoredValue>,
    pub ts: Option<StoredValue>,
    pub lat: Option<StoredValue>,
    pub lng: Option<StoredValue>,
}

/// Body of the JSON export
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JsonExport {
    pub vlogs: Vec<VlogEntry>,
    pub sentiments: Vec<SentimentEntry>,
    pub gps: Vec<GpsEntry>,
}

/// Display-ready row for the HTML table and the archive CSV
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub id: Option<StoredValue>,
    /// Stored timestamp without fractional seconds; `None` if not stored
    pub timestamp: Option<String>,
    pub mood: Option<String>,
    /// Latitude rounded to 4 decimals (0.0 when not stored)
    pub lat: f64,
    /// Longitude rounded to 4 decimals (0.0 when not stored)
    pub lng: f64,
    pub filename: Option<String>,
    /// Relative link (`/videos/{filename}`), present iff `filename` is
    pub file_url: Option<String>,
}

/// Project samples into the three JSON lists
///
/// `base_url` is the externally visible address of this service; video URLs
/// are `{base_url}/videos/{filename}`.
pub fn project_json(samples: &[Sample], base_url: &str) -> JsonExport {
    let vlogs = samples
        .iter()
        .filter_map(|s| {
            s.media_filename().map(|filename| VlogEntry {
                id: s.id.clone(),
                ts: s.ts.clone(),
                video_filename: filename.to_string(),
                video_url: absolute_media_url(base_url, filename),
            })
        })
        .collect();

    let sentiments = samples
        .iter()
        .map(|s| SentimentEntry {
            id: s.id.clone(),
            ts: s.ts.clone(),
            mood: s.mood.clone(),
        })
        .collect();

    let gps = samples
        .iter()
        .map(|s| GpsEntry {
            id: s.id.clone(),
            ts: s.ts.clone(),
            lat: s.lat.clone(),
            lng: s.lng.clone(),
        })
        .collect();

    JsonExport {
        vlogs,
        sentiments,
        gps,
    }
}

/// Project samples into tabular rows, one per sample
///
/// Fails with `ExportError::DataFormat` on the first coordinate that is not
/// numeric; the whole export call fails with it.
pub fn project_rows(samples: &[Sample]) -> ExportResult<Vec<ExportRow>> {
    samples.iter().map(project_row).collect()
}

/// Project a single sample into a tabular row
pub fn project_row(sample: &Sample) -> ExportResult<ExportRow> {
    let filename = sample.media_filename().map(str::to_string);
    let file_url = filename.as_deref().map(relative_media_url);

    Ok(ExportRow {
        id: sample.id.clone(),
        timestamp: sample.ts.as_ref().map(display_timestamp),
        mood: sample.mood.clone(),
        lat: round_coordinate(sample.lat.as_ref(), "lat")?,
        lng: round_coordinate(sample.lng.as_ref(), "lng")?,
        filename,
        file_url,
    })
}

/// `/videos/{filename}`
pub fn relative_media_url(filename: &str) -> String {
    format!("{}/{}", MEDIA_PATH_PREFIX, filename)
}

/// `{base_url}/videos/{filename}`
pub fn absolute_media_url(base_url: &str, filename: &str) -> String {
    format!(
        "{}{}",
        base_url.trim_end_matches('/'),
        relative_media_url(filename)
    )
}

/// Render a stored timestamp without fractional seconds
///
/// Text is parsed structurally (ISO 8601 with `T` or space separator,
/// optional fraction, optional zone) and re-rendered as
/// `YYYY-MM-DDTHH:MM:SS` in the wall-clock time it was recorded in. Numeric
/// values are seconds since the Unix epoch (UTC). Text that does not parse
/// is cut at its first `.`.
pub fn display_timestamp(ts: &StoredValue) -> String {
    match ts {
        StoredValue::Text(text) => match parse_timestamp(text) {
            Some(parsed) => parsed.format(TIMESTAMP_DISPLAY_FORMAT).to_string(),
            None => truncate_fraction(text).to_string(),
        },
        StoredValue::Integer(secs) => format_epoch(*secs).unwrap_or_else(|| secs.to_string()),
        StoredValue::Real(secs) => {
            let whole = secs.floor();
            format_epoch(whole as i64).unwrap_or_else(|| format!("{}", whole))
        }
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_local());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            ZONED_FORMATS
                .iter()
                .find_map(|fmt| DateTime::parse_from_str(text, fmt).ok())
                .map(|parsed| parsed.naive_local())
        })
}

fn truncate_fraction(text: &str) -> &str {
    match text.find('.') {
        Some(idx) => &text[..idx],
        None => text,
    }
}

fn format_epoch(secs: i64) -> Option<String> {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc().format(TIMESTAMP_DISPLAY_FORMAT).to_string())
}

/// Interpret a stored coordinate and round it to 4 decimal places
///
/// A missing value is 0.0. Rounding follows the exact binary value of the
/// float (ties to even), matching `format!("{:.4}")`.
pub fn round_coordinate(value: Option<&StoredValue>, field: &str) -> ExportResult<f64> {
    let raw = match value {
        None => return Ok(0.0),
        Some(v) => v.as_f64().ok_or_else(|| {
            ExportError::DataFormat(format!("{} is not numeric: {:?}", field, v.to_string()))
        })?,
    };

    if !raw.is_finite() {
        return Err(ExportError::DataFormat(format!(
            "{} is not a finite number: {}",
            field, raw
        )));
    }

    let rounded: f64 = format!("{:.4}", raw)
        .parse()
        .map_err(|_| ExportError::DataFormat(format!("{} could not be rounded: {}", field, raw)))?;

    // Avoid rendering "-0.0000"
    Ok(if rounded == 0.0 { 0.0 } else { rounded })
}
