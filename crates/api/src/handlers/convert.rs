//! Handler for submitting a conversion job.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use jacport_core::types::JobId;
use jacport_pipeline::ConversionJob;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppResult;
use crate::state::AppState;

/// Body of `POST /api/convert`.
#[derive(Debug, Deserialize, Validate)]
pub struct ConvertRequest {
    #[validate(url(message = "github_url must be a valid URL"))]
    pub github_url: String,
    /// Also convert test files and test directories.
    #[serde(default)]
    pub include_tests: bool,
    /// Model for this job's calls; the configured default when absent.
    #[validate(length(min = 1, message = "target_model must not be empty"))]
    pub target_model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub job_id: JobId,
    pub status: &'static str,
    pub stream_url: String,
}

/// POST /api/convert
///
/// Registers the job before responding, so a stream opened right after the
/// response always finds it, then runs the pipeline in the background.
pub async fn start_conversion(
    State(state): State<AppState>,
    Json(input): Json<ConvertRequest>,
) -> AppResult<Json<ConvertResponse>> {
    input.validate()?;

    let job_id = JobId::generate();
    let emitter = state.registry.create(job_id.clone()).await;

    let job = ConversionJob {
        job_id: job_id.clone(),
        repo_url: input.github_url,
        include_tests: input.include_tests,
        model: input.target_model,
    };

    tracing::info!(
        job_id = %job_id,
        url = %job.repo_url,
        include_tests = job.include_tests,
        "Conversion submitted",
    );

    let pipeline = Arc::clone(&state.pipeline);
    state.tasks.spawn(async move {
        pipeline.run(job, emitter).await;
    });

    Ok(Json(ConvertResponse {
        stream_url: format!("/api/stream/{job_id}"),
        job_id,
        status: "started",
    }))
}
