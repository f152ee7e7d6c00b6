//! Zip packaging of a finished run.
//!
//! Each job produces exactly one archive at `{output_dir}/{job_id}.zip`
//! containing the generated files, the README, the demo script and a
//! credential placeholder.

use std::io::Write;
use std::path::{Path, PathBuf};

use jacport_core::types::JobId;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const README_NAME: &str = "README.md";
pub const DEMO_NAME: &str = "demo.sh";
pub const ENV_EXAMPLE_NAME: &str = ".env.example";

/// Placeholder written to `.env.example`.
pub const ENV_EXAMPLE: &str = "ANTHROPIC_API_KEY=sk-ant-your-key-here\n";

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive encoding failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive task failed: {0}")]
    Task(String),
}

/// Contents of one output archive.
#[derive(Debug, Clone, Default)]
pub struct ArchiveContents {
    /// `(archive path, text)` for every generated file.
    pub files: Vec<(String, String)>,
    pub readme: String,
    pub demo_script: String,
}

/// Location of the archive for `job_id` under `dir`.
pub fn archive_path(dir: &Path, job_id: &JobId) -> PathBuf {
    dir.join(format!("{job_id}.zip"))
}

/// Write the archive on the blocking pool and return its path.
pub async fn write_archive(
    dir: &Path,
    job_id: &JobId,
    contents: ArchiveContents,
) -> Result<PathBuf, ArchiveError> {
    let dir = dir.to_path_buf();
    let path = archive_path(&dir, job_id);
    let target = path.clone();

    tokio::task::spawn_blocking(move || -> Result<(), ArchiveError> {
        std::fs::create_dir_all(&dir)?;
        let written = write_zip(&target, &contents);
        if written.is_err() {
            // Best-effort removal of the partial archive.
            let _ = std::fs::remove_file(&target);
        }
        written
    })
    .await
    .map_err(|e| ArchiveError::Task(e.to_string()))??;

    Ok(path)
}

fn write_zip(path: &Path, contents: &ArchiveContents) -> Result<(), ArchiveError> {
    let file = std::fs::File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, text) in &contents.files {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(text.as_bytes())?;
    }
    for (name, text) in [
        (README_NAME, contents.readme.as_str()),
        (DEMO_NAME, contents.demo_script.as_str()),
        (ENV_EXAMPLE_NAME, ENV_EXAMPLE),
    ] {
        zip.start_file(name, options)?;
        zip.write_all(text.as_bytes())?;
    }

    zip.finish()?;
    Ok(())
}
