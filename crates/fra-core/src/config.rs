use std::fmt;
use std::str::FromStr;

use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("update_url is not a valid URL: {0}")]
    InvalidUpdateUrl(String),
    #[error("update_url must use http or https, got {scheme}")]
    UnsupportedScheme { scheme: String },
    #[error("github_repo must look like owner/name, got {0:?}")]
    InvalidGitHubRepo(String),
}

/// A GitHub repository identifier in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubRepo {
    owner: String,
    name: String,
}

impl GitHubRepo {
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn is_valid_repo_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
}

impl FromStr for GitHubRepo {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let (owner, name) = trimmed
            .split_once('/')
            .ok_or_else(|| ConfigError::InvalidGitHubRepo(value.to_string()))?;

        if !is_valid_repo_segment(owner) || !is_valid_repo_segment(name) {
            return Err(ConfigError::InvalidGitHubRepo(value.to_string()));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for GitHubRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Where update metadata comes from. The custom endpoint wins when both are
/// configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSourceConfig {
    update_url: Option<Url>,
    github_repo: Option<GitHubRepo>,
}

impl UpdateSourceConfig {
    /// Validate raw settings values. Blank strings count as unset.
    ///
    /// # Errors
    /// Returns an error when `update_url` is not an absolute http(s) URL or
    /// `github_repo` is not in `owner/name` form.
    pub fn new(update_url: Option<&str>, github_repo: Option<&str>) -> Result<Self, ConfigError> {
        let update_url = match non_blank(update_url) {
            Some(raw) => {
                let url =
                    Url::parse(raw).map_err(|e| ConfigError::InvalidUpdateUrl(e.to_string()))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(ConfigError::UnsupportedScheme {
                        scheme: url.scheme().to_string(),
                    });
                }
                Some(url)
            }
            None => None,
        };

        let github_repo = non_blank(github_repo)
            .map(str::parse::<GitHubRepo>)
            .transpose()?;

        Ok(Self {
            update_url,
            github_repo,
        })
    }

    #[must_use]
    pub fn update_url(&self) -> Option<&Url> {
        self.update_url.as_ref()
    }

    #[must_use]
    pub fn github_repo(&self) -> Option<&GitHubRepo> {
        self.github_repo.as_ref()
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.update_url.is_some() || self.github_repo.is_some()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// How the host identifies this plugin in update lists and installer events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginIdentity {
    pub slug: String,
    pub basename: String,
    pub name: String,
}

impl Default for PluginIdentity {
    fn default() -> Self {
        Self {
            slug: "france-relocation-assistant".to_string(),
            basename: "france-relocation-assistant/france-relocation-assistant.php".to_string(),
            name: "France Relocation Assistant".to_string(),
        }
    }
}
