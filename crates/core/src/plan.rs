//! Structural mapping plan produced once per run by the plan stage.
//!
//! The plan is requested from the model as JSON. It is parsed into a typed
//! [`ConversionPlan`] and validated; any failure is recoverable and callers
//! substitute [`ConversionPlan::fallback`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::conversion::strip_code_fences;

/// Maps a source data class onto a graph node declaration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeMapping {
    pub original_class: String,
    pub jac_node: String,
    pub fields: Vec<String>,
}

/// Maps a route handler or business-logic unit onto a walker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerMapping {
    pub original: String,
    pub jac_walker: String,
    pub purpose: String,
}

/// A typed relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeMapping {
    pub from_node: String,
    pub to_node: String,
    pub edge_name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionPlan {
    pub nodes: Vec<NodeMapping>,
    pub walkers: Vec<WalkerMapping>,
    pub edges: Vec<EdgeMapping>,
    /// File paths in the order they should be converted, dependencies first.
    pub order: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Plan is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Plan failed validation: {0}")]
    Invalid(String),
}

impl ConversionPlan {
    /// Parse a raw model response (optionally fenced) into a validated plan.
    pub fn parse(raw: &str) -> Result<Self, PlanError> {
        let cleaned = strip_code_fences(raw, "json");
        let plan: ConversionPlan = serde_json::from_str(&cleaned)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Empty plan that keeps files in their input order.
    pub fn fallback<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            order: paths.into_iter().map(str::to_string).collect(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), PlanError> {
        if let Some(node) = self.nodes.iter().find(|n| n.jac_node.trim().is_empty()) {
            return Err(PlanError::Invalid(format!(
                "node mapping for '{}' has no jac_node name",
                node.original_class
            )));
        }
        if let Some(walker) = self.walkers.iter().find(|w| w.jac_walker.trim().is_empty()) {
            return Err(PlanError::Invalid(format!(
                "walker mapping for '{}' has no jac_walker name",
                walker.original
            )));
        }
        if self
            .edges
            .iter()
            .any(|e| e.from_node.trim().is_empty() || e.to_node.trim().is_empty())
        {
            return Err(PlanError::Invalid("edge mapping is missing an endpoint".into()));
        }
        if self.order.iter().any(|p| p.trim().is_empty()) {
            return Err(PlanError::Invalid("order contains an empty path".into()));
        }
        Ok(())
    }

    /// Stable-sort `items` by their position in [`order`](Self::order).
    ///
    /// Items whose path is not listed keep their relative order and go last.
    /// When a path is listed more than once its first position wins.
    pub fn apply_order<T>(&self, items: &mut [T], path_of: impl Fn(&T) -> &str) {
        let mut rank: HashMap<&str, usize> = HashMap::with_capacity(self.order.len());
        for (i, path) in self.order.iter().enumerate() {
            rank.entry(path.as_str()).or_insert(i);
        }
        items.sort_by_key(|item| rank.get(path_of(item)).copied().unwrap_or(usize::MAX));
    }

    /// Pretty JSON rendering used as context in conversion prompts.
    pub fn to_context(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
