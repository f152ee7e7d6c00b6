use std::path::PathBuf;
use std::time::Duration;

/// Default cap on files fetched per run.
pub const DEFAULT_MAX_FILES: usize = 50;

/// Default retries per file conversion (total attempts = retries + 1).
pub const DEFAULT_MAX_RETRIES: u32 = 1;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_files: usize,
    pub max_retries: u32,
    /// Upper bound on each stage's fan-out; `None` waits indefinitely.
    pub stage_timeout: Option<Duration>,
    /// Directory receiving `{job_id}.zip` archives.
    pub output_dir: PathBuf,
}

impl PipelineConfig {
    /// Load pipeline configuration from environment variables.
    ///
    /// | Env Var              | Default             |
    /// |----------------------|---------------------|
    /// | `MAX_FILES`          | `50`                |
    /// | `MAX_RETRIES`        | `1`                 |
    /// | `STAGE_TIMEOUT_SECS` | unset (unbounded)   |
    /// | `OUTPUT_DIR`         | system temp dir     |
    pub fn from_env() -> Self {
        let max_files: usize = std::env::var("MAX_FILES")
            .unwrap_or_else(|_| DEFAULT_MAX_FILES.to_string())
            .parse()
            .expect("MAX_FILES must be a valid usize");

        let max_retries: u32 = std::env::var("MAX_RETRIES")
            .unwrap_or_else(|_| DEFAULT_MAX_RETRIES.to_string())
            .parse()
            .expect("MAX_RETRIES must be a valid u32");

        let stage_timeout = std::env::var("STAGE_TIMEOUT_SECS").ok().map(|v| {
            Duration::from_secs(v.parse().expect("STAGE_TIMEOUT_SECS must be a valid u64"))
        });

        let output_dir = std::env::var("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());

        Self {
            max_files,
            max_retries,
            stage_timeout,
            output_dir,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            max_retries: DEFAULT_MAX_RETRIES,
            stage_timeout: None,
            output_dir: std::env::temp_dir(),
        }
    }
}
