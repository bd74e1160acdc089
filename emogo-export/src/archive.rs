//! Archive assembly
//!
//! Builds the downloadable package: a generated CSV entry followed by the
//! referenced media files under `videos/`, in row order. Media that is not
//! on disk is skipped; the CSV still lists every row.
//!
//! The container is assembled in memory and finalized before any byte is
//! handed to the caller, since the zip central directory is written last.

use std::collections::HashSet;
use std::future::Future;
use std::io::{Cursor, Write};
use std::path::{Component, Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ExportError, ExportResult};
use crate::projector::ExportRow;

/// Name of the generated CSV entry
pub const CSV_ENTRY_NAME: &str = "emogo_export.csv";

/// Directory prefix of media entries inside the archive
pub const MEDIA_ENTRY_PREFIX: &str = "videos/";

/// CSV header, fixed order
pub const CSV_HEADER: [&str; 6] = ["ID", "Timestamp", "Mood", "Latitude", "Longitude", "Filename"];

/// Entry options shared by every entry
///
/// Fixed timestamp and permissions keep the byte layout stable across runs.
fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644)
}

/// Incremental writer for one export archive
pub struct ArchiveBuilder {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    media_entries: usize,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            media_entries: 0,
        }
    }

    /// Write the CSV summary entry
    pub fn add_csv(&mut self, rows: &[ExportRow]) -> ExportResult<()> {
        let csv = render_csv(rows)?;
        self.zip.start_file(CSV_ENTRY_NAME, entry_options())?;
        self.zip.write_all(&csv)?;
        Ok(())
    }

    /// Write one media file as `videos/{filename}`
    pub fn add_media(&mut self, filename: &str, contents: &[u8]) -> ExportResult<()> {
        self.zip
            .start_file(format!("{}{}", MEDIA_ENTRY_PREFIX, filename), entry_options())?;
        self.zip.write_all(contents)?;
        self.media_entries += 1;
        Ok(())
    }

    /// Number of media entries written so far
    pub fn media_entries(&self) -> usize {
        self.media_entries
    }

    /// Write the central directory and return the finished container
    pub fn finish(self) -> ExportResult<Vec<u8>> {
        let cursor = self.zip.finish()?;
        Ok(cursor.into_inner())
    }
}

/// Serialize rows as CSV (header first, coordinates with 4 decimals)
pub fn render_csv(rows: &[ExportRow]) -> ExportResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for row in rows {
        writer.write_record([
            row.id.as_ref().map(|v| v.to_string()).unwrap_or_default(),
            row.timestamp.clone().unwrap_or_default(),
            row.mood.clone().unwrap_or_default(),
            format!("{:.4}", row.lat),
            format!("{:.4}", row.lng),
            row.filename.clone().unwrap_or_default(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

/// Finished archive plus counts for logging
#[derive(Debug)]
pub struct BuiltArchive {
    pub bytes: Vec<u8>,
    pub media_included: usize,
    pub media_skipped: usize,
}

/// Assemble the complete archive for `rows`, reading media from `media_root`
///
/// Each media read is a cancellation point: once `cancel` fires the build
/// stops with `ExportError::Cancelled`. A file referenced by several rows is
/// stored once. Files that are missing, not regular files, or whose name
/// would resolve outside `media_root` are skipped. Any other I/O failure
/// fails the build.
pub async fn build_archive(
    rows: &[ExportRow],
    media_root: &Path,
    cancel: &CancellationToken,
) -> ExportResult<BuiltArchive> {
    build_archive_with(rows, media_root, cancel, read_media).await
}

async fn build_archive_with<F, Fut>(
    rows: &[ExportRow],
    media_root: &Path,
    cancel: &CancellationToken,
    read: F,
) -> ExportResult<BuiltArchive>
where
    F: Fn(PathBuf) -> Fut,
    Fut: Future<Output = std::io::Result<Option<Vec<u8>>>>,
{
    let mut builder = ArchiveBuilder::new();
    builder.add_csv(rows)?;

    let mut seen: HashSet<&str> = HashSet::new();
    let mut media_skipped = 0;

    for filename in rows.iter().filter_map(|row| row.filename.as_deref()) {
        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        if !seen.insert(filename) {
            continue;
        }

        let Some(path) = resolve_media_path(media_root, filename) else {
            warn!("Skipping media with unsafe name: {:?}", filename);
            media_skipped += 1;
            continue;
        };

        let contents = tokio::select! {
            _ = cancel.cancelled() => return Err(ExportError::Cancelled),
            result = read(path.clone()) => result?,
        };

        match contents {
            Some(bytes) => builder.add_media(filename, &bytes)?,
            None => {
                debug!("Media not found, skipping: {}", path.display());
                media_skipped += 1;
            }
        }
    }

    let media_included = builder.media_entries();
    let bytes = builder.finish()?;

    Ok(BuiltArchive {
        bytes,
        media_included,
        media_skipped,
    })
}

/// Join `filename` onto `root` if it only contains normal path components
fn resolve_media_path(root: &Path, filename: &str) -> Option<PathBuf> {
    let relative = Path::new(filename);
    let mut components = relative.components().peekable();

    components.peek()?;
    if components.all(|c| matches!(c, Component::Normal(_))) {
        Some(root.join(relative))
    } else {
        None
    }
}

/// Read a media file, mapping "absent" to `None`
async fn read_media(path: PathBuf) -> std::io::Result<Option<Vec<u8>>> {
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    }

    // The file can disappear between the metadata check and the read
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
