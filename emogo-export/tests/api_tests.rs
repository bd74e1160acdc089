//! Integration tests for emogo-export API endpoints
//!
//! Tests cover:
//! - JSON export fan-out (vlogs filtered on media, sentiments/gps unconditional)
//! - HTML table export
//! - Zip package export (best-effort media bundling, headers, empty input)
//! - Error responses (non-numeric coordinates, unavailable repository)
//! - Static media serving, health and root endpoints

use std::io::{Cursor, Read};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use emogo_common::db::{
    connect_readonly, init_database, insert_sample, SampleRepository, SqliteSampleRepository,
};
use emogo_common::{Error, Sample, StoredValue};
use emogo_export::{build_router, AppState};
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method
use zip::ZipArchive;

/// In-memory repository returning samples in the given order
struct FixedSamples(Vec<Sample>);

#[async_trait]
impl SampleRepository for FixedSamples {
    async fn fetch_all_ordered(&self) -> emogo_common::Result<Vec<Sample>> {
        Ok(self.0.clone())
    }
}

/// Repository whose store is down
struct UnavailableSamples;

#[async_trait]
impl SampleRepository for UnavailableSamples {
    async fn fetch_all_ordered(&self) -> emogo_common::Result<Vec<Sample>> {
        Err(Error::NotFound("sample table is missing".to_string()))
    }
}

fn sample(id: &str, ts: &str, media: Option<&str>) -> Sample {
    Sample {
        id: Some(StoredValue::Text(id.to_string())),
        ts: Some(StoredValue::Text(ts.to_string())),
        mood: Some("happy".to_string()),
        lat: Some(StoredValue::Real(25.033964217)),
        lng: Some(StoredValue::Real(121.564468103)),
        media_filename: media.map(str::to_string),
    }
}

/// Three samples: two with clips on disk, one referencing a missing clip,
/// and one without any clip
fn standard_samples() -> Vec<Sample> {
    vec![
        sample("s1", "2025-11-26T10:23:35.482000", Some("a.mp4")),
        sample("s2", "2025-11-26T10:24:00", Some("missing.mp4")),
        sample("s3", "2025-11-26T10:25:00", None),
        sample("s4", "2025-11-26T10:26:00", Some("c.mp4")),
    ]
}

/// Test helper: media directory with a.mp4 and c.mp4
fn setup_media() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.mp4"), b"clip-a").unwrap();
    std::fs::write(dir.path().join("c.mp4"), b"clip-c").unwrap();
    dir
}

/// Test helper: Create app over a fixed sample list
fn setup_app(samples: Vec<Sample>, media: &TempDir) -> axum::Router {
    let state = AppState::new(Arc::new(FixedSamples(samples)), media.path());
    build_router(state)
}

/// Test helper: Create GET request
fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::HOST, "emogo.test:8000")
        .body(Body::empty())
        .unwrap()
}

async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).expect("Should parse JSON")
}

fn entry_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("Archive should open");
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

fn csv_entry(bytes: &[u8]) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("Archive should open");
    let mut entry = archive.by_name("emogo_export.csv").expect("CSV entry");
    let mut csv = String::new();
    entry.read_to_string(&mut csv).unwrap();
    csv
}

// =============================================================================
// Health / Root
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let media = setup_media();
    let app = setup_app(vec![], &media);

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "emogo-export");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_root_message() {
    let media = setup_media();
    let app = setup_app(vec![], &media);

    let response = app.oneshot(get("/")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["message"], "EmoGo backend is running");
}

#[tokio::test]
async fn test_buildinfo_endpoint() {
    let media = setup_media();
    let app = setup_app(vec![], &media);

    let response = app.oneshot(get("/api/buildinfo")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert!(body["git_hash"].is_string());
    assert!(body["build_profile"].is_string());
}

// =============================================================================
// JSON export
// =============================================================================

#[tokio::test]
async fn test_json_export_fan_out() {
    let media = setup_media();
    let app = setup_app(standard_samples(), &media);

    let response = app.oneshot(get("/export_json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let vlogs = body["vlogs"].as_array().unwrap();
    let sentiments = body["sentiments"].as_array().unwrap();
    let gps = body["gps"].as_array().unwrap();

    // s3 has no clip: absent from vlogs only
    assert_eq!(vlogs.len(), 3);
    assert_eq!(sentiments.len(), 4);
    assert_eq!(gps.len(), 4);

    assert_eq!(vlogs[0]["id"], "s1");
    assert_eq!(vlogs[0]["video_filename"], "a.mp4");
    assert_eq!(vlogs[0]["video_url"], "http://emogo.test:8000/videos/a.mp4");
    // Raw timestamp, not the display form
    assert_eq!(vlogs[0]["ts"], "2025-11-26T10:23:35.482000");

    assert_eq!(sentiments[2]["id"], "s3");
    assert_eq!(sentiments[2]["mood"], "happy");
    assert_eq!(gps[2]["id"], "s3");
    assert_eq!(gps[2]["ts"], sentiments[2]["ts"]);
    // Raw coordinates, not rounded
    assert_eq!(gps[0]["lat"], 25.033964217);
}

#[tokio::test]
async fn test_json_export_preserves_order() {
    let media = setup_media();
    let app = setup_app(standard_samples(), &media);

    let response = app.oneshot(get("/export_json")).await.unwrap();
    let body = extract_json(response.into_body()).await;

    let ids: Vec<&str> = body["gps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["s1", "s2", "s3", "s4"]);
}

#[tokio::test]
async fn test_json_export_uses_configured_base_url() {
    let media = setup_media();
    let state = AppState::new(Arc::new(FixedSamples(standard_samples())), media.path())
        .with_public_base_url(Some("https://emogo.example.org/".to_string()));
    let app = build_router(state);

    let response = app.oneshot(get("/export_json")).await.unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(
        body["vlogs"][0]["video_url"],
        "https://emogo.example.org/videos/a.mp4"
    );
}

#[tokio::test]
async fn test_json_export_empty() {
    let media = setup_media();
    let app = setup_app(vec![], &media);

    let response = app.oneshot(get("/export_json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body, serde_json::json!({"vlogs": [], "sentiments": [], "gps": []}));
}

#[tokio::test]
async fn test_json_export_ignores_bad_coordinates() {
    // The JSON surface passes coordinates through without parsing them
    let media = setup_media();
    let mut bad = sample("s1", "2025-11-26T10:23:35", None);
    bad.lat = Some(StoredValue::Text("north".to_string()));
    let app = setup_app(vec![bad], &media);

    let response = app.oneshot(get("/export_json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["gps"][0]["lat"], "north");
}

// =============================================================================
// Table export
// =============================================================================

#[tokio::test]
async fn test_table_export_renders_rows() {
    let media = setup_media();
    let app = setup_app(standard_samples(), &media);

    let response = app.oneshot(get("/export")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let html = String::from_utf8(body_bytes(response.into_body()).await).unwrap();
    assert!(html.contains("<td>2025-11-26T10:23:35</td>"));
    assert!(!html.contains("10:23:35.482"));
    assert!(html.contains("25.0340"));
    assert!(html.contains("121.5645"));
    assert!(html.contains("href=\"/videos/a.mp4\""));
    assert!(html.contains("4 samples"));
}

#[tokio::test]
async fn test_table_export_fails_on_non_numeric_coordinate() {
    let media = setup_media();
    let mut bad = sample("s1", "2025-11-26T10:23:35", None);
    bad.lng = Some(StoredValue::Text("east".to_string()));
    let app = setup_app(vec![bad], &media);

    let response = app.oneshot(get("/export")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "DATA_FORMAT_ERROR");
}

// =============================================================================
// Archive export
// =============================================================================

#[tokio::test]
async fn test_zip_export_best_effort_bundle() {
    let media = setup_media();
    let app = setup_app(standard_samples(), &media);

    let response = app.oneshot(get("/export-zip")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/x-zip-compressed"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"emogo_package.zip\""
    );

    let bytes = body_bytes(response.into_body()).await;

    // CSV first, then media in row order; missing.mp4 skipped
    assert_eq!(
        entry_names(&bytes),
        vec!["emogo_export.csv", "videos/a.mp4", "videos/c.mp4"]
    );

    let csv = csv_entry(&bytes);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "ID,Timestamp,Mood,Latitude,Longitude,Filename");
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[1], "s1,2025-11-26T10:23:35,happy,25.0340,121.5645,a.mp4");
    assert_eq!(lines[2], "s2,2025-11-26T10:24:00,happy,25.0340,121.5645,missing.mp4");
    assert_eq!(lines[3], "s3,2025-11-26T10:25:00,happy,25.0340,121.5645,");
}

#[tokio::test]
async fn test_zip_export_empty() {
    let media = setup_media();
    let app = setup_app(vec![], &media);

    let response = app.oneshot(get("/export-zip")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = body_bytes(response.into_body()).await;
    assert_eq!(entry_names(&bytes), vec!["emogo_export.csv"]);
    assert_eq!(
        csv_entry(&bytes).trim_end(),
        "ID,Timestamp,Mood,Latitude,Longitude,Filename"
    );
}

#[tokio::test]
async fn test_zip_export_default_coordinates() {
    let media = setup_media();
    let mut no_fix = sample("s1", "2025-11-26T10:23:35", None);
    no_fix.lat = None;
    no_fix.lng = None;
    let app = setup_app(vec![no_fix], &media);

    let response = app.oneshot(get("/export-zip")).await.unwrap();
    let csv = csv_entry(&body_bytes(response.into_body()).await);

    assert_eq!(
        csv.lines().nth(1),
        Some("s1,2025-11-26T10:23:35,happy,0.0000,0.0000,")
    );
}

#[tokio::test]
async fn test_zip_export_fails_on_non_numeric_coordinate() {
    let media = setup_media();
    let mut bad = sample("s2", "2025-11-26T10:24:00", Some("a.mp4"));
    bad.lat = Some(StoredValue::Text("north".to_string()));
    let app = setup_app(vec![sample("s1", "2025-11-26T10:23:35", None), bad], &media);

    let response = app.oneshot(get("/export-zip")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "DATA_FORMAT_ERROR");
}

#[tokio::test]
async fn test_zip_export_after_shutdown_is_cancelled() {
    let media = setup_media();
    let shutdown = tokio_util::sync::CancellationToken::new();
    shutdown.cancel();

    let state = AppState::new(Arc::new(FixedSamples(standard_samples())), media.path())
        .with_shutdown(shutdown);
    let app = build_router(state);

    let response = app.oneshot(get("/export-zip")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "CANCELLED");
}

// =============================================================================
// Repository failures
// =============================================================================

#[tokio::test]
async fn test_repository_unavailable() {
    let media = setup_media();
    let state = AppState::new(Arc::new(UnavailableSamples), media.path());

    for uri in ["/export_json", "/export", "/export-zip"] {
        let app = build_router(state.clone());
        let response = app.oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE, "{}", uri);

        let body = extract_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "REPOSITORY_UNAVAILABLE");
    }
}

// =============================================================================
// Static media
// =============================================================================

#[tokio::test]
async fn test_videos_served_from_media_dir() {
    let media = setup_media();
    let app = setup_app(vec![], &media);

    let response = app.clone().oneshot(get("/videos/a.mp4")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, b"clip-a");

    let response = app.oneshot(get("/videos/missing.mp4")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// End to end over SQLite
// =============================================================================

#[tokio::test]
async fn test_sqlite_backed_exports() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("emogo.db");
    let media = setup_media();

    let pool = init_database(&db_path).await.unwrap();
    // Inserted out of order; the repository sorts by ts
    insert_sample(&pool, &sample("late", "2025-11-26T12:00:00", Some("c.mp4")))
        .await
        .unwrap();
    insert_sample(&pool, &sample("early", "2025-11-26T08:00:00.5", Some("a.mp4")))
        .await
        .unwrap();
    pool.close().await;

    let pool = connect_readonly(&db_path).await.unwrap();
    let state = AppState::new(Arc::new(SqliteSampleRepository::new(pool)), media.path());
    let app = build_router(state);

    let response = app.clone().oneshot(get("/export_json")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["vlogs"][0]["id"], "early");
    assert_eq!(body["vlogs"][1]["id"], "late");

    let response = app.oneshot(get("/export-zip")).await.unwrap();
    let bytes = body_bytes(response.into_body()).await;
    assert_eq!(
        entry_names(&bytes),
        vec!["emogo_export.csv", "videos/a.mp4", "videos/c.mp4"]
    );
    assert!(csv_entry(&bytes)
        .lines()
        .nth(1)
        .unwrap()
        .starts_with("early,2025-11-26T08:00:00,"));
}
