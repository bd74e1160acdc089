//! Sample repository
//!
//! `SampleRepository` is the seam between the export pipeline and the sample
//! store. The pipeline receives it as an injected dependency and only needs
//! one operation: every sample, ascending by timestamp.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool, ValueRef};
use tracing::debug;

use super::init::SAMPLES_TABLE;
use crate::models::{Sample, StoredValue};
use crate::{Error, Result};

/// Columns that may hold the media reference, in read priority order
///
/// `video_filename` and `videoname` are legacy names for `media_filename`.
const MEDIA_COLUMNS: [&str; 3] = ["media_filename", "video_filename", "videoname"];

/// Plain sample columns read as-is when present
const SAMPLE_COLUMNS: [&str; 5] = ["id", "ts", "mood", "lat", "lng"];

/// Read-only access to the stored samples
#[async_trait]
pub trait SampleRepository: Send + Sync {
    /// Fetch all samples ordered by `ts` ascending
    ///
    /// Callers rely on this order and never re-sort.
    async fn fetch_all_ordered(&self) -> Result<Vec<Sample>>;
}

/// SQLite-backed sample repository
#[derive(Debug, Clone)]
pub struct SqliteSampleRepository {
    pool: SqlitePool,
    table: String,
}

impl SqliteSampleRepository {
    /// Repository over the default samples table
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            table: SAMPLES_TABLE.to_string(),
        }
    }

    /// Repository over a differently named table
    ///
    /// The name is interpolated into SQL, so only alphanumerics and
    /// underscores are accepted.
    pub fn with_table(pool: SqlitePool, table: &str) -> Result<Self> {
        if !is_valid_table_name(table) {
            return Err(Error::Config(format!("Invalid table name: {}", table)));
        }

        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    /// Column names of the sample table (empty if the table does not exist)
    async fn table_columns(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(&format!("PRAGMA table_info({})", self.table))
            .fetch_all(&self.pool)
            .await?;

        // PRAGMA table_info returns: (cid, name, type, notnull, dflt_value, pk)
        Ok(rows.iter().map(|row| row.get::<String, _>(1)).collect())
    }
}

#[async_trait]
impl SampleRepository for SqliteSampleRepository {
    async fn fetch_all_ordered(&self) -> Result<Vec<Sample>> {
        let columns = self.table_columns().await?;
        if columns.is_empty() {
            return Err(Error::NotFound(format!("Sample table not found: {}", self.table)));
        }

        let sql = build_select(&self.table, &columns);
        debug!("Fetching samples: {}", sql);

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(sample_from_row).collect())
    }
}

/// Characters ignored when deciding whether a media column is blank
const BLANK_CHARS: &str = "' ' || char(9, 10, 11, 12, 13)";

/// Build the SELECT for whichever sample columns the table actually has
///
/// Missing plain columns are selected as NULL. The media reference is the
/// first value among the media columns present that is not empty or
/// whitespace only, matching `Sample::media_filename`.
fn build_select(table: &str, columns: &[String]) -> String {
    let has = |name: &str| columns.iter().any(|c| c == name);

    let mut select: Vec<String> = SAMPLE_COLUMNS
        .iter()
        .map(|name| {
            if has(*name) {
                name.to_string()
            } else {
                format!("NULL AS {}", name)
            }
        })
        .collect();

    let media: Vec<String> = MEDIA_COLUMNS
        .iter()
        .filter(|name| has(**name))
        .map(|name| {
            format!(
                "CASE WHEN TRIM({c}, {ws}) = '' THEN NULL ELSE {c} END",
                c = name,
                ws = BLANK_CHARS
            )
        })
        .collect();

    let media_expr = match media.len() {
        0 => "NULL".to_string(),
        1 => media[0].clone(),
        _ => format!("COALESCE({})", media.join(", ")),
    };
    select.push(format!("{} AS media_filename", media_expr));

    let mut sql = format!("SELECT {} FROM {}", select.join(", "), table);
    if has("ts") {
        // rowid keeps equal timestamps in insertion order
        sql.push_str(" ORDER BY ts ASC, rowid ASC");
    }
    sql
}

fn sample_from_row(row: &SqliteRow) -> Sample {
    Sample {
        id: stored_value(row, "id"),
        ts: stored_value(row, "ts"),
        mood: stored_value(row, "mood").map(|v| v.to_string()),
        lat: stored_value(row, "lat"),
        lng: stored_value(row, "lng"),
        media_filename: stored_value(row, "media_filename")
            .map(|v| v.to_string())
            .filter(|name| !name.trim().is_empty()),
    }
}

/// Decode a column in whatever storage class SQLite holds it in
fn stored_value(row: &SqliteRow, column: &str) -> Option<StoredValue> {
    let is_null = row
        .try_get_raw(column)
        .map(|val| val.is_null())
        .unwrap_or(true);
    if is_null {
        return None;
    }

    row.try_get::<String, _>(column)
        .ok()
        .map(StoredValue::Text)
        .or_else(|| row.try_get::<i64, _>(column).ok().map(StoredValue::Integer))
        .or_else(|| row.try_get::<f64, _>(column).ok().map(StoredValue::Real))
}

/// Validate table name to prevent SQL injection
fn is_valid_table_name(name: &str) -> bool {
    name.chars().all(|c| c.is_alphanumeric() || c == '_')
        && !name.is_empty()
        && name.len() < 100
}
