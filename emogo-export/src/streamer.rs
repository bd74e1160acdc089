//! Archive delivery
//!
//! Wraps a finished archive buffer in an attachment response. The body is
//! sent with chunked transfer framing; chunks are zero-copy slices of the
//! single buffer, so no second copy of the archive is made.

use std::convert::Infallible;

use axum::{
    body::{Body, Bytes},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures::stream;

/// Download name offered to the client
pub const PACKAGE_FILENAME: &str = "emogo_package.zip";

/// Content type of the archive response
pub const ARCHIVE_CONTENT_TYPE: &str = "application/x-zip-compressed";

/// Size of each body chunk
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Build the attachment response for a finished archive
pub fn archive_response(archive: Vec<u8>) -> Response {
    let bytes = Bytes::from(archive);
    let total = bytes.len();

    let chunks = (0..total).step_by(CHUNK_SIZE).map(move |start| {
        let end = (start + CHUNK_SIZE).min(total);
        Ok::<_, Infallible>(bytes.slice(start..end))
    });

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, ARCHIVE_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", PACKAGE_FILENAME),
            ),
        ],
        Body::from_stream(stream::iter(chunks)),
    )
        .into_response()
}
