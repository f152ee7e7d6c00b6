use async_trait::async_trait;

use crate::error::GatewayError;

/// A single completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Short label of the call site (e.g. `"classify"`), used in logs.
    pub purpose: &'static str,
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Default output budget for a single completion.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

impl CompletionRequest {
    pub fn new(purpose: &'static str, model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            purpose,
            model: model.into(),
            prompt: prompt.into(),
            temperature: 0.2,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// External text-generation provider.
///
/// Implementations perform exactly one call with no retry; retry policy
/// belongs to the call site.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError>;
}
