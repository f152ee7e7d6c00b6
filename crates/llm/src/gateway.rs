//! Bounded-concurrency wrapper around a [`TextGenerator`].
//!
//! A single [`Gateway`] is shared by every pipeline run in the process. Each
//! call acquires a permit from a fixed-size semaphore before reaching the
//! provider and releases it when the call resolves, whether it succeeded,
//! failed, or timed out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use crate::error::GatewayError;
use crate::generator::{CompletionRequest, TextGenerator};

/// Default number of concurrent in-flight calls.
pub const DEFAULT_MAX_PARALLEL: usize = 5;

/// Default per-call timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Global admission limit for in-flight calls.
    pub max_parallel: usize,
    /// Per-call timeout; `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
    /// Model used when a job does not request one.
    pub default_model: String,
}

impl GatewayConfig {
    /// Load gateway configuration from environment variables.
    ///
    /// | Env Var            | Default                   |
    /// |--------------------|---------------------------|
    /// | `MAX_PARALLEL`     | `5`                       |
    /// | `LLM_TIMEOUT_SECS` | `120` (`0` disables)      |
    /// | `JAC_MODEL`        | `claude-3-haiku-20240307` |
    pub fn from_env() -> Self {
        let max_parallel: usize = std::env::var("MAX_PARALLEL")
            .unwrap_or_else(|_| DEFAULT_MAX_PARALLEL.to_string())
            .parse()
            .expect("MAX_PARALLEL must be a valid usize");
        assert!(max_parallel > 0, "MAX_PARALLEL must be at least 1");

        let timeout_secs: u64 = std::env::var("LLM_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse()
            .expect("LLM_TIMEOUT_SECS must be a valid u64");

        let default_model = std::env::var("JAC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());

        Self {
            max_parallel,
            call_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            default_model,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL,
            call_timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}

pub struct Gateway {
    generator: Arc<dyn TextGenerator>,
    permits: Arc<Semaphore>,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(generator: Arc<dyn TextGenerator>, config: GatewayConfig) -> Self {
        Self {
            generator,
            permits: Arc::new(Semaphore::new(config.max_parallel)),
            config,
        }
    }

    pub fn default_model(&self) -> &str {
        &self.config.default_model
    }

    /// Number of calls that could start right now without waiting.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Refuse all further calls. In-flight calls finish normally.
    pub fn close(&self) {
        self.permits.close();
    }

    /// Run one completion under the global admission limit.
    pub async fn generate(&self, request: CompletionRequest) -> Result<String, GatewayError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| GatewayError::Closed)?;

        let started = Instant::now();
        let call = self.generator.complete(&request);
        let result = match self.config.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(GatewayError::Timeout(limit))),
            None => call.await,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(text) => tracing::debug!(
                purpose = request.purpose,
                model = %request.model,
                elapsed_ms,
                chars = text.len(),
                "Completion finished",
            ),
            Err(e) => tracing::warn!(
                purpose = request.purpose,
                model = %request.model,
                elapsed_ms,
                error = %e,
                "Completion failed",
            ),
        }
        result
    }
}
