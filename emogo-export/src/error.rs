//! Error types for emogo-export
//!
//! Every error is scoped to one export call: the call fails as a whole and
//! nothing partial is returned. Missing media files are not errors (they
//! are skipped during archive assembly).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

/// Export pipeline error
#[derive(Debug, Error)]
pub enum ExportError {
    /// Stored value could not be interpreted (e.g. non-numeric coordinate)
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// Archive container could not be written
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// CSV entry could not be written
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Media file existed but could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller went away before the archive was finished
    #[error("Export cancelled")]
    Cancelled,

    /// emogo-common error (repository, configuration)
    #[error("{0}")]
    Common(emogo_common::Error),
}

impl From<emogo_common::Error> for ExportError {
    fn from(err: emogo_common::Error) -> Self {
        match err {
            emogo_common::Error::DataFormat(msg) => ExportError::DataFormat(msg),
            other => ExportError::Common(other),
        }
    }
}

impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ExportError::DataFormat(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DATA_FORMAT_ERROR")
            }
            ExportError::Archive(_) | ExportError::Csv(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ARCHIVE_ERROR")
            }
            ExportError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            ExportError::Cancelled => (StatusCode::INTERNAL_SERVER_ERROR, "CANCELLED"),
            ExportError::Common(emogo_common::Error::Database(_))
            | ExportError::Common(emogo_common::Error::NotFound(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "REPOSITORY_UNAVAILABLE")
            }
            ExportError::Common(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let message = self.to_string();
        warn!("Export failed ({}): {}", error_code, message);

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for export operations and handlers
pub type ExportResult<T> = Result<T, ExportError>;
