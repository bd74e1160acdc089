//! Sample store access
//!
//! The export service only ever reads the sample table; `connect_readonly`
//! is what the service uses. `init_database` and `insert_sample` exist for
//! the composing application (seeding, imports) and for tests.

pub mod init;
pub mod samples;

pub use init::{init_database, insert_sample, SAMPLES_TABLE};
pub use samples::{SampleRepository, SqliteSampleRepository};

use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

/// Connect to the sample database in read-only mode
///
/// Fails with `Error::NotFound` if the database file does not exist, rather
/// than letting SQLite create an empty one.
pub async fn connect_readonly(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        return Err(Error::NotFound(format!(
            "Database not found: {}",
            db_path.display()
        )));
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}
