//! Per-file conversion state and the rules that judge generated output.

use serde::Serialize;

use crate::role::FileRole;

/// Confidence of an output accepted on the first attempt.
pub const BASE_CONFIDENCE: f64 = 0.95;

/// Confidence lost for every retry spent before acceptance.
pub const RETRY_PENALTY: f64 = 0.08;

/// Confidence of a fallback produced because every call errored.
pub const ERROR_FALLBACK_CONFIDENCE: f64 = 0.50;

/// Confidence of a fallback produced because the output had no declarations.
pub const UNKEYWORDED_FALLBACK_CONFIDENCE: f64 = 0.55;

/// Files below this confidence are flagged for manual review.
pub const REVIEW_THRESHOLD: f64 = 0.75;

/// Extension of generated files.
pub const TARGET_EXTENSION: &str = "jac";

/// One file of the repository being converted. Lives for a single run.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    /// Path relative to the repository root.
    pub path: String,
    pub content: String,
    pub role: FileRole,
    pub generated: String,
    pub validated: bool,
    pub confidence: f64,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            role: FileRole::default(),
            generated: String::new(),
            validated: false,
            confidence: ERROR_FALLBACK_CONFIDENCE,
        }
    }

    /// Path of the generated file inside the output archive.
    pub fn target_path(&self) -> String {
        target_path(&self.path)
    }

    pub fn needs_review(&self) -> bool {
        self.confidence < REVIEW_THRESHOLD
    }
}

/// Confidence for an output accepted on `attempt` (0-indexed), never below 0.
pub fn accepted_confidence(attempt: u32) -> f64 {
    (BASE_CONFIDENCE - f64::from(attempt) * RETRY_PENALTY).max(0.0)
}

/// Whether `code` contains a node, walker/ability, or field declaration.
pub fn has_required_markers(code: &str) -> bool {
    let declares_node = code.contains("node ");
    let declares_walker = code.contains("walker ") || code.contains("can ");
    let declares_field = code.contains("has ");
    declares_node || declares_walker || declares_field
}

/// Remove markdown code fences (```` ```lang ```` and bare ```` ``` ````) and trim.
pub fn strip_code_fences(text: &str, lang: &str) -> String {
    text.replace(&format!("```{lang}"), "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Deterministic placeholder used when generation fails or is rejected.
pub fn fallback_output(path: &str, role: FileRole) -> String {
    let name = role.title();
    format!(
        "# AUTO-CONVERTED (fallback) - manual review recommended\n\
         # Original: {path}\n\
         \n\
         node {name}Node {{\n    has data: dict = {{}};\n}}\n\
         \n\
         walker {name}Walker {{\n    can run with {name}Node entry {{\n        report \"Fallback for {path}\";\n    }}\n}}\n"
    )
}

/// Map a source path onto its generated counterpart (`a/b.py` -> `a/b.jac`).
pub fn target_path(path: &str) -> String {
    match path.strip_suffix(".py") {
        Some(stem) => format!("{stem}.{TARGET_EXTENSION}"),
        None => path.to_string(),
    }
}

/// Round to two decimals for client-facing scores.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Arithmetic mean confidence across `files`, or `0.0` for an empty slice.
pub fn mean_confidence(files: &[SourceFile]) -> f64 {
    if files.is_empty() {
        return 0.0;
    }
    files.iter().map(|f| f.confidence).sum::<f64>() / files.len() as f64
}
