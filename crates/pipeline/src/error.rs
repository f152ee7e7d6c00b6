use std::time::Duration;

use jacport_core::types::Stage;
use jacport_github::SourceError;

use crate::archive::ArchiveError;

/// Failures that end a run with a terminal `error` event.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("GitHub error: {0}")]
    Fetch(#[from] SourceError),

    #[error("No Python files found.")]
    NoFiles,

    #[error("Pipeline error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Pipeline error: {stage} stage timed out after {limit:?}")]
    StageTimeout { stage: Stage, limit: Duration },

    #[error("Pipeline error: {0}")]
    Internal(String),
}
