//! Client for the Anthropic Messages API.
//!
//! Sends a single user message per call via [`reqwest`] and returns the
//! trimmed text of the first content block.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::generator::{CompletionRequest, TextGenerator};

/// API version header required by the provider.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default provider base URL.
pub const DEFAULT_API_URL: &str = "https://api.anthropic.com";

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    /// Base HTTP URL, e.g. `https://api.anthropic.com`.
    pub api_url: String,
}

impl AnthropicConfig {
    /// Load provider configuration from environment variables.
    ///
    /// | Env Var             | Default                     |
    /// |---------------------|-----------------------------|
    /// | `ANTHROPIC_API_KEY` | empty (calls will fail)     |
    /// | `ANTHROPIC_API_URL` | `https://api.anthropic.com` |
    pub fn from_env() -> Self {
        let api_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            tracing::error!("ANTHROPIC_API_KEY is not set, text generation will fail");
        }
        let api_url =
            std::env::var("ANTHROPIC_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self { api_key, api_url }
    }
}

pub struct AnthropicClient {
    client: reqwest::Client,
    config: AnthropicConfig,
}

#[derive(Debug, Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    // ---- private helpers ----

    /// Return the response unchanged on a success status, otherwise a
    /// [`GatewayError::Api`] carrying the status and body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Extract the completion text from a raw Messages API response body.
pub fn extract_text(body: &str) -> Result<String, GatewayError> {
    let parsed: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| GatewayError::Malformed(format!("invalid response JSON: {e}")))?;
    parsed
        .content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| GatewayError::Malformed("response has no text content".into()))
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        let body = MessagesBody {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: [Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.api_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        extract_text(&response.text().await?)
    }
}
