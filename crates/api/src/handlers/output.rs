//! Handlers for a finished job's preview and archive.

use std::io::ErrorKind;

use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use jacport_core::error::CoreError;
use jacport_core::preview::Preview;
use jacport_core::types::JobId;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

const PREVIEW_NOT_READY: &str = "Preview not ready yet";
const OUTPUT_NOT_READY: &str = "Output not ready yet";
const ARCHIVE_FILENAME: &str = "converted-jac.zip";

// ---------------------------------------------------------------------------
// GET /api/preview/{job_id}
// ---------------------------------------------------------------------------

/// Preview of converted files and generated documents.
///
/// Unknown, evicted and still-running jobs all answer 404.
pub async fn get_preview(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<Json<Preview>> {
    let preview = state
        .registry
        .preview(&job_id)
        .await
        .ok_or_else(|| CoreError::NotReady(PREVIEW_NOT_READY.into()))?;

    Ok(Json(Preview::clone(&preview)))
}

// ---------------------------------------------------------------------------
// GET /api/download/{job_id}
// ---------------------------------------------------------------------------

/// The job's ZIP archive as an attachment.
pub async fn download_archive(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let path = state
        .registry
        .output(&job_id)
        .await
        .ok_or_else(|| CoreError::NotReady(OUTPUT_NOT_READY.into()))?;

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            tracing::warn!(job_id = %job_id, path = %path.display(), "Archive missing on disk");
            AppError::Core(CoreError::NotReady(OUTPUT_NOT_READY.into()))
        }
        _ => AppError::InternalError(format!("Failed to read archive {}: {e}", path.display())),
    })?;

    tracing::debug!(job_id = %job_id, size = bytes.len(), "Serving archive");

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/zip".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{ARCHIVE_FILENAME}\""),
            ),
        ],
        bytes,
    ))
}
