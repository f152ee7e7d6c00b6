//! Conversion of a single file with bounded retries and fallback.

use jacport_core::conversion::{
    accepted_confidence, fallback_output, has_required_markers, strip_code_fences, SourceFile,
    ERROR_FALLBACK_CONFIDENCE, UNKEYWORDED_FALLBACK_CONFIDENCE,
};
use jacport_llm::{CompletionRequest, Gateway};

use crate::prompts;

/// Sampling temperature for conversion calls.
const CONVERT_TEMPERATURE: f32 = 0.2;

/// Why a file ended up with fallback output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Every attempt failed at the gateway.
    CallError,
    /// The model answered with text without any required declaration.
    Unkeyworded,
}

impl FailureKind {
    pub fn confidence(self) -> f64 {
        match self {
            FailureKind::CallError => ERROR_FALLBACK_CONFIDENCE,
            FailureKind::Unkeyworded => UNKEYWORDED_FALLBACK_CONFIDENCE,
        }
    }
}

/// Result of converting one file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileConversion {
    pub generated: String,
    pub validated: bool,
    pub confidence: f64,
}

impl FileConversion {
    fn accepted(code: String, attempt: u32) -> Self {
        Self {
            generated: code,
            validated: true,
            confidence: accepted_confidence(attempt),
        }
    }

    fn fallback(file: &SourceFile, failure: FailureKind) -> Self {
        Self {
            generated: fallback_output(&file.path, file.role),
            validated: false,
            confidence: failure.confidence(),
        }
    }

    pub fn apply_to(self, file: &mut SourceFile) {
        file.generated = self.generated;
        file.validated = self.validated;
        file.confidence = self.confidence;
    }
}

/// Convert `file`, making up to `max_retries + 1` attempts.
///
/// Only failed calls are retried, each retry carrying the previous error in
/// its prompt. An answer without any Jac declaration falls back at once.
pub async fn convert_file(
    gateway: &Gateway,
    model: &str,
    file: &SourceFile,
    plan_context: &str,
    max_retries: u32,
) -> FileConversion {
    let mut previous_error = String::new();

    for attempt in 0..=max_retries {
        let request = CompletionRequest::new(
            "convert",
            model,
            prompts::convert_file(file, plan_context, &previous_error),
        )
        .with_temperature(CONVERT_TEMPERATURE);

        match gateway.generate(request).await {
            Ok(raw) => {
                let code = strip_code_fences(&raw, "jac");
                if !has_required_markers(&code) {
                    tracing::warn!(path = %file.path, attempt, "Conversion output has no Jac declarations, using fallback");
                    return FileConversion::fallback(file, FailureKind::Unkeyworded);
                }
                let conversion = FileConversion::accepted(code, attempt);
                tracing::info!(
                    path = %file.path,
                    attempt,
                    confidence = conversion.confidence,
                    "File converted",
                );
                return conversion;
            }
            Err(e) => {
                tracing::error!(path = %file.path, attempt, error = %e, "Conversion call failed");
                previous_error = e.to_string();
            }
        }
    }

    tracing::warn!(path = %file.path, attempts = max_retries + 1, "Retries exhausted, using fallback output");
    FileConversion::fallback(file, FailureKind::CallError)
}
