//! Events streamed to the client for one job.
//!
//! Every event has a kind (`progress`, `complete`, `error`) and a JSON data
//! payload. `complete` and `error` are terminal: at most one is emitted per
//! job and nothing follows it.

use serde::Serialize;

use crate::role::FileRole;
use crate::types::Stage;

/// SSE event name for progress updates.
pub const EVENT_PROGRESS: &str = "progress";

/// SSE event name for the successful terminal event.
pub const EVENT_COMPLETE: &str = "complete";

/// SSE event name for the failed terminal event.
pub const EVENT_ERROR: &str = "error";

/// Payload of a `progress` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressData {
    pub step: Stage,
    /// Overall completion percentage, `0..=100`.
    pub pct: u8,
    /// File path being processed, or a human-readable status line.
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<FileRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated: Option<bool>,
}

impl ProgressData {
    pub fn new(step: Stage, pct: u8, file: impl Into<String>) -> Self {
        Self {
            step,
            pct,
            file: file.into(),
            role: None,
            confidence: None,
            validated: None,
        }
    }

    pub fn with_role(mut self, role: FileRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_result(mut self, confidence: f64, validated: bool) -> Self {
        self.confidence = Some(confidence);
        self.validated = Some(validated);
        self
    }
}

/// Payload of the `complete` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompleteData {
    pub download_url: String,
    pub total_files: usize,
    pub avg_confidence: f64,
}

/// Payload of the `error` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorData {
    pub message: String,
    pub recoverable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Progress(ProgressData),
    Complete(CompleteData),
    Error(ErrorData),
}

impl JobEvent {
    pub fn progress(step: Stage, pct: u8, file: impl Into<String>) -> Self {
        JobEvent::Progress(ProgressData::new(step, pct, file))
    }

    /// A non-recoverable failure of the run.
    pub fn fatal(message: impl Into<String>) -> Self {
        JobEvent::Error(ErrorData {
            message: message.into(),
            recoverable: false,
        })
    }

    /// SSE event name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::Progress(_) => EVENT_PROGRESS,
            JobEvent::Complete(_) => EVENT_COMPLETE,
            JobEvent::Error(_) => EVENT_ERROR,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobEvent::Progress(_))
    }

    /// Serialized data payload.
    pub fn data(&self) -> serde_json::Value {
        let value = match self {
            JobEvent::Progress(data) => serde_json::to_value(data),
            JobEvent::Complete(data) => serde_json::to_value(data),
            JobEvent::Error(data) => serde_json::to_value(data),
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}
