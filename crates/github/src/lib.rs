//! Source-hosting collaborator.
//!
//! [`SourceFetcher`] is the seam the pipeline fetches repository files
//! through; [`GitHubClient`] implements it over the GitHub contents API.

pub mod client;
pub mod filter;
pub mod repo;

use async_trait::async_trait;

pub use client::{GitHubClient, GitHubConfig};
pub use filter::FileFilter;
pub use repo::RepoRef;

/// A file downloaded from the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFile {
    /// Path relative to the repository root.
    pub path: String,
    pub content: String,
}

/// Errors from the source-hosting layer.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Invalid GitHub URL: {0}")]
    InvalidUrl(String),

    #[error("Repo not found or is private: {0}")]
    NotFound(String),

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// GitHub returned a non-2xx status code.
    #[error("GitHub API error ({status}): {body}")]
    Api { status: u16, body: String },
}

/// Lists and downloads the eligible source files of a repository.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch at most `limit` eligible files from `repo_url`.
    async fn fetch_files(
        &self,
        repo_url: &str,
        filter: &FileFilter,
        limit: usize,
    ) -> Result<Vec<RemoteFile>, SourceError>;
}
