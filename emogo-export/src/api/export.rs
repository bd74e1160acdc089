//! Export endpoints
//!
//! All three surfaces read the full sample set in repository order on every
//! call. Each call fails as a whole on a repository or data-format error.

use axum::{
    extract::State,
    http::HeaderMap,
    response::{Html, Response},
    Json,
};
use tracing::info;

use crate::archive::build_archive;
use crate::error::ExportResult;
use crate::projector::{project_json, project_rows, JsonExport};
use crate::render::render_export_page;
use crate::streamer::archive_response;
use crate::AppState;

/// GET /export_json
///
/// `{vlogs, sentiments, gps}`; video URLs are absolute.
pub async fn export_json(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ExportResult<Json<JsonExport>> {
    let samples = state.samples.fetch_all_ordered().await?;
    let base_url = state.base_url(&headers);

    let export = project_json(&samples, &base_url);
    info!(
        "JSON export: {} samples, {} vlogs",
        samples.len(),
        export.vlogs.len()
    );

    Ok(Json(export))
}

/// GET /export
///
/// HTML table with relative video links.
pub async fn export_table(State(state): State<AppState>) -> ExportResult<Html<String>> {
    let samples = state.samples.fetch_all_ordered().await?;
    let rows = project_rows(&samples)?;

    info!("Table export: {} rows", rows.len());
    Ok(Html(render_export_page(&rows)))
}

/// GET /export-zip
///
/// Zip package with `emogo_export.csv` and the available clips under
/// `videos/`, downloaded as `emogo_package.zip`.
pub async fn export_zip(State(state): State<AppState>) -> ExportResult<Response> {
    let samples = state.samples.fetch_all_ordered().await?;
    let rows = project_rows(&samples)?;

    // Cancelled on server shutdown, or when this future is dropped because
    // the client went away.
    let cancel = state.shutdown.child_token();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let archive = build_archive(&rows, &state.media_root, &cancel).await?;
    info!(
        "Archive export: {} rows, {} media included, {} media skipped, {} bytes",
        rows.len(),
        archive.media_included,
        archive.media_skipped,
        archive.bytes.len()
    );

    Ok(archive_response(archive.bytes))
}
