use std::time::Duration;

use jacport_pipeline::PipelineConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// Timeout for non-streaming requests in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for running pipelines, in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Age after which a job is evicted from the registry (default: `3600`).
    pub job_ttl_secs: u64,
    /// How long a stream waits for its job to be registered (default: `5000`).
    pub stream_wait_ms: u64,
    /// Idle time before the stream sends a keepalive comment (default: `60`).
    pub keepalive_secs: u64,
    /// Pipeline limits and output location.
    pub pipeline: PipelineConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `8000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:3000`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `JOB_TTL_SECS`         | `3600`                     |
    /// | `STREAM_WAIT_MS`       | `5000`                     |
    /// | `KEEPALIVE_SECS`       | `60` (must be at least 1)  |
    ///
    /// Pipeline variables are documented on [`PipelineConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs: env_u64("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_u64("SHUTDOWN_TIMEOUT_SECS", 30),
            job_ttl_secs: env_u64("JOB_TTL_SECS", 3600),
            stream_wait_ms: env_u64("STREAM_WAIT_MS", 5000),
            keepalive_secs: require_positive("KEEPALIVE_SECS", env_u64("KEEPALIVE_SECS", 60)),
            pipeline: PipelineConfig::from_env(),
        }
    }

    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(self.job_ttl_secs)
    }

    pub fn stream_wait(&self) -> Duration {
        Duration::from_millis(self.stream_wait_ms)
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid u64")),
        Err(_) => default,
    }
}

fn require_positive(name: &str, value: u64) -> u64 {
    assert!(value > 0, "{name} must be at least 1");
    value
}
