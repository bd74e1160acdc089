//! Database initialization
//!
//! Creates the sample table if needed. The table keeps the legacy
//! `video_filename` and `videoname` columns next to `media_filename` so that
//! imported data written under either name stays readable.

use crate::models::{Sample, StoredValue};
use crate::Result;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

/// Table holding the stored samples
pub const SAMPLES_TABLE: &str = "samples_ts_rating_gps";

/// Open (creating if needed) a writable database and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_samples_table(&pool).await?;

    Ok(pool)
}

async fn create_samples_table(pool: &SqlitePool) -> Result<()> {
    // id, lat and lng are declared without a type so values keep the storage
    // class they were written with.
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id,
            ts TEXT,
            mood TEXT,
            lat,
            lng,
            media_filename TEXT,
            video_filename TEXT,
            videoname TEXT
        )
        "#,
        table = SAMPLES_TABLE
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_ts ON {table} (ts)",
        table = SAMPLES_TABLE
    ))
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert one sample, writing the media reference to `media_filename`
pub async fn insert_sample(pool: &SqlitePool, sample: &Sample) -> Result<()> {
    let sql = format!(
        "INSERT INTO {} (id, ts, mood, lat, lng, media_filename) VALUES (?, ?, ?, ?, ?, ?)",
        SAMPLES_TABLE
    );

    let query = sqlx::query(&sql);
    let query = bind_stored(query, &sample.id);
    let query = bind_stored(query, &sample.ts);
    let query = query.bind(sample.mood.as_deref());
    let query = bind_stored(query, &sample.lat);
    let query = bind_stored(query, &sample.lng);
    let query = query.bind(sample.media_filename.as_deref());

    query.execute(pool).await?;
    Ok(())
}

fn bind_stored<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Option<StoredValue>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        None => query.bind(None::<String>),
        Some(StoredValue::Integer(v)) => query.bind(*v),
        Some(StoredValue::Real(v)) => query.bind(*v),
        Some(StoredValue::Text(s)) => query.bind(s.as_str()),
    }
}
