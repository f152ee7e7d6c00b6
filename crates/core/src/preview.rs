//! Preview payload recorded once the assemble stage has finished.

use serde::{Deserialize, Serialize};

use crate::conversion::{round2, SourceFile};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewFile {
    /// Path of the generated file (extension remapped).
    pub path: String,
    pub original: String,
    pub converted: String,
    pub confidence: f64,
    pub validated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preview {
    pub files: Vec<PreviewFile>,
    pub readme: String,
    pub demo_script: String,
}

impl Preview {
    pub fn build(files: &[SourceFile], readme: &str, demo_script: &str) -> Self {
        Self {
            files: files
                .iter()
                .map(|f| PreviewFile {
                    path: f.target_path(),
                    original: f.content.clone(),
                    converted: f.generated.clone(),
                    confidence: round2(f.confidence),
                    validated: f.validated,
                })
                .collect(),
            readme: readme.to_string(),
            demo_script: demo_script.to_string(),
        }
    }
}
