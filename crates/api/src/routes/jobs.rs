//! Route definitions for conversion jobs.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{convert, output, stream};
use crate::state::AppState;

/// Short-lived job routes.
///
/// ```text
/// POST   /convert                 -> start_conversion
/// GET    /preview/{job_id}        -> get_preview
/// GET    /download/{job_id}       -> download_archive
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/convert", post(convert::start_conversion))
        .route("/preview/{job_id}", get(output::get_preview))
        .route("/download/{job_id}", get(output::download_archive))
}

/// Long-lived progress stream.
///
/// ```text
/// GET    /stream/{job_id}         -> stream_progress
/// ```
pub fn stream_router() -> Router<AppState> {
    Router::new().route("/stream/{job_id}", get(stream::stream_progress))
}
