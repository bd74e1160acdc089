//! emogo-export library - sample export service
//!
//! Projects the stored samples into three download surfaces: a JSON
//! payload, an HTML table and a zip package (CSV summary plus the recorded
//! video clips). The recorded clips are also served as static files under
//! `/videos`.

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{header, HeaderMap};
use axum::Router;
use emogo_common::db::SampleRepository;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod archive;
pub mod error;
pub mod projector;
pub mod render;
pub mod streamer;

pub use error::{ExportError, ExportResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Read-only sample store
    pub samples: Arc<dyn SampleRepository>,
    /// Directory holding the recorded clips
    pub media_root: PathBuf,
    /// Configured external address; derived from `Host` when unset
    pub public_base_url: Option<String>,
    /// Fired on server shutdown; in-flight archive builds stop on it
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create new application state
    pub fn new(samples: Arc<dyn SampleRepository>, media_root: impl Into<PathBuf>) -> Self {
        Self {
            samples,
            media_root: media_root.into(),
            public_base_url: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_public_base_url(mut self, url: Option<String>) -> Self {
        self.public_base_url = url.map(|u| u.trim_end_matches('/').to_string());
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Base address for absolute media URLs
    ///
    /// Uses the configured public base URL if there is one, otherwise
    /// `http://{Host header}`, otherwise `http://localhost`.
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(url) = &self.public_base_url {
            return url.clone();
        }

        headers
            .get(header::HOST)
            .and_then(|host| host.to_str().ok())
            .filter(|host| !host.is_empty())
            .map(|host| format!("http://{}", host))
            .unwrap_or_else(|| "http://localhost".to_string())
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let media = ServeDir::new(&state.media_root);

    Router::new()
        .route("/", get(api::root))
        .route("/export_json", get(api::export_json))
        .route("/export", get(api::export_table))
        .route("/export-zip", get(api::export_zip))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes())
        .nest_service("/videos", media)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
