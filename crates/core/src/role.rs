//! Architectural role of a source file.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Role assigned to each source file during the analyze stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    Model,
    Controller,
    Service,
    /// Fallback role when classification fails or is unrecognised.
    #[default]
    Util,
}

impl FileRole {
    pub const ALL: [FileRole; 4] = [
        FileRole::Model,
        FileRole::Controller,
        FileRole::Service,
        FileRole::Util,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FileRole::Model => "model",
            FileRole::Controller => "controller",
            FileRole::Service => "service",
            FileRole::Util => "util",
        }
    }

    /// Interpret a free-form classifier answer, defaulting to [`FileRole::Util`].
    pub fn from_response(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }

    /// Capitalised form used in generated identifiers, e.g. `Model`.
    pub fn title(self) -> &'static str {
        match self {
            FileRole::Model => "Model",
            FileRole::Controller => "Controller",
            FileRole::Service => "Service",
            FileRole::Util => "Util",
        }
    }
}

impl FromStr for FileRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        FileRole::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| CoreError::Validation(format!("Unknown file role '{s}'")))
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
