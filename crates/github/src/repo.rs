use crate::SourceError;

/// `owner/name` coordinates parsed from a repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

const GITHUB_PREFIXES: &[&str] = &["https://github.com/", "http://github.com/", "github.com/"];

impl RepoRef {
    /// Parse `https://github.com/{owner}/{name}[.git][/...]`.
    pub fn parse(url: &str) -> Result<Self, SourceError> {
        let trimmed = url.trim().trim_end_matches('/');
        let rest = GITHUB_PREFIXES
            .iter()
            .find_map(|prefix| trimmed.strip_prefix(prefix))
            .unwrap_or(trimmed);

        let mut parts = rest.split('/').filter(|p| !p.is_empty());
        match (parts.next(), parts.next()) {
            (Some(owner), Some(name)) => {
                let name = name.strip_suffix(".git").unwrap_or(name);
                if name.is_empty() || owner.contains(':') {
                    return Err(SourceError::InvalidUrl(url.to_string()));
                }
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(SourceError::InvalidUrl(url.to_string())),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Display name of a repository: last URL segment without `.git`.
pub fn repo_display_name(url: &str) -> String {
    let last = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}
