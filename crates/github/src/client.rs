//! GitHub contents-API client.
//!
//! Walks the repository tree directory by directory and downloads the raw
//! text of every eligible file until the limit is reached. Unreadable
//! subdirectories and files are skipped; failures on the repository itself
//! are returned to the caller.

use async_trait::async_trait;
use serde::Deserialize;

use crate::filter::FileFilter;
use crate::repo::RepoRef;
use crate::{RemoteFile, SourceError, SourceFetcher};

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("jacport/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// Personal access token; anonymous requests when absent.
    pub token: Option<String>,
    pub api_url: String,
}

impl GitHubConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var          | Default                  |
    /// |------------------|--------------------------|
    /// | `GITHUB_TOKEN`   | none (anonymous)         |
    /// | `GITHUB_API_URL` | `https://api.github.com` |
    pub fn from_env() -> Self {
        let token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        let api_url = std::env::var("GITHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        Self { token, api_url }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

/// One entry of a contents-API directory listing.
#[derive(Debug, Deserialize)]
struct ContentItem {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    download_url: Option<String>,
}

pub struct GitHubClient {
    client: reqwest::Client,
    config: GitHubConfig,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Confirm the repository exists and is visible with our credentials.
    async fn check_repo(&self, repo: &RepoRef) -> Result<(), SourceError> {
        let url = format!("{}/repos/{}", self.config.api_url, repo.full_name());
        let response = self.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(repo.full_name()));
        }
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn list_dir(&self, repo: &RepoRef, path: &str) -> Result<Vec<ContentItem>, SourceError> {
        let url = format!(
            "{}/repos/{}/contents/{}",
            self.config.api_url,
            repo.full_name(),
            path
        );
        let response = Self::ensure_success(self.get(&url).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn download(&self, url: &str) -> Result<String, SourceError> {
        let response = Self::ensure_success(self.get(url).send().await?).await?;
        let bytes = response.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, SourceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SourceError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl SourceFetcher for GitHubClient {
    async fn fetch_files(
        &self,
        repo_url: &str,
        filter: &FileFilter,
        limit: usize,
    ) -> Result<Vec<RemoteFile>, SourceError> {
        let repo = RepoRef::parse(repo_url)?;
        self.check_repo(&repo).await?;

        let mut files = Vec::new();
        // Depth-first; each directory's files come before its subdirectories.
        let mut pending = vec![String::new()];

        while let Some(dir) = pending.pop() {
            if files.len() >= limit {
                break;
            }

            let items = match self.list_dir(&repo, &dir).await {
                Ok(items) => items,
                Err(e) if !dir.is_empty() => {
                    tracing::warn!(repo = %repo.full_name(), dir = %dir, error = %e, "Skipping unreadable directory");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let mut subdirs = Vec::new();
            for item in items {
                if files.len() >= limit {
                    break;
                }
                match item.kind.as_str() {
                    "dir" if filter.allows_dir(&item.name) => subdirs.push(item.path),
                    "file" if filter.allows_file(&item.name) => {
                        let Some(url) = item.download_url else {
                            continue;
                        };
                        match self.download(&url).await {
                            Ok(content) => files.push(RemoteFile {
                                path: item.path,
                                content,
                            }),
                            Err(e) => {
                                tracing::warn!(path = %item.path, error = %e, "Skipping unreadable file");
                            }
                        }
                    }
                    _ => {}
                }
            }
            pending.extend(subdirs.into_iter().rev());
        }

        tracing::info!(repo = %repo.full_name(), count = files.len(), "Fetched repository files");
        Ok(files)
    }
}
