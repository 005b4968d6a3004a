use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::version::{is_newer_version, version_from_tag};

pub const DEFAULT_REQUIRES: &str = "6.0";
pub const DEFAULT_TESTED: &str = "6.9";
pub const DEFAULT_REQUIRES_PHP: &str = "7.4";

fn default_requires() -> String {
    DEFAULT_REQUIRES.to_string()
}

fn default_tested() -> String {
    DEFAULT_TESTED.to_string()
}

fn default_requires_php() -> String {
    DEFAULT_REQUIRES_PHP.to_string()
}

/// Metadata about the latest known release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInfo {
    pub version: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub changelog: Option<String>,
    #[serde(default = "default_requires")]
    pub requires: String,
    #[serde(default = "default_tested")]
    pub tested: String,
    #[serde(default = "default_requires_php")]
    pub requires_php: String,
}

impl UpdateInfo {
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            url: None,
            package: String::new(),
            changelog: None,
            requires: default_requires(),
            tested: default_tested(),
            requires_php: default_requires_php(),
        }
    }
}

/// Body served by a custom update endpoint. Every field may be absent or
/// `null`; defaults are applied when it becomes an [`UpdateInfo`].
#[derive(Debug, Deserialize)]
struct ManifestDocument {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    package: Option<String>,
    #[serde(default)]
    changelog: Option<String>,
    #[serde(default)]
    requires: Option<String>,
    #[serde(default)]
    tested: Option<String>,
    #[serde(default)]
    requires_php: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubAsset {
    pub name: String,
    pub browser_download_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub zipball_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub assets: Vec<GitHubAsset>,
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("update request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("update source {url} answered HTTP {status}{body_snippet}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        body_snippet: String,
    },
    #[error("malformed update payload: {0}")]
    MalformedPayload(String),
    #[error("no update source is configured")]
    NotConfigured,
}

/// Parse the body served by a custom update endpoint.
///
/// # Errors
/// Returns [`UpdateError::MalformedPayload`] when the body is not JSON or the
/// `version` field is missing, `null` or blank.
pub fn parse_manifest(body: &str) -> Result<UpdateInfo, UpdateError> {
    let document: ManifestDocument =
        serde_json::from_str(body).map_err(|e| UpdateError::MalformedPayload(e.to_string()))?;

    let version = document
        .version
        .filter(|version| !version.trim().is_empty())
        .ok_or_else(|| UpdateError::MalformedPayload("manifest has no version".to_string()))?;

    Ok(UpdateInfo {
        version,
        url: document.url,
        package: document.package.unwrap_or_default(),
        changelog: document.changelog,
        requires: document.requires.unwrap_or_else(default_requires),
        tested: document.tested.unwrap_or_else(default_tested),
        requires_php: document.requires_php.unwrap_or_else(default_requires_php),
    })
}

/// Pick the installable artifact for a release: the first `.zip` asset in
/// listed order, then the source archive, then nothing.
#[must_use]
pub fn select_package(release: &GitHubRelease) -> String {
    release
        .assets
        .iter()
        .find(|asset| asset.name.contains(".zip"))
        .map(|asset| asset.browser_download_url.clone())
        .or_else(|| release.zipball_url.clone())
        .unwrap_or_default()
}

/// Map a GitHub release onto update metadata.
///
/// # Errors
/// Returns [`UpdateError::MalformedPayload`] when the release has no tag.
pub fn info_from_release(release: GitHubRelease) -> Result<UpdateInfo, UpdateError> {
    let tag = release
        .tag_name
        .as_deref()
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .ok_or_else(|| UpdateError::MalformedPayload("release has no tag_name".to_string()))?;

    let version = version_from_tag(tag);
    if version.is_empty() {
        return Err(UpdateError::MalformedPayload(format!(
            "release tag {tag:?} carries no version"
        )));
    }

    let package = select_package(&release);
    let mut info = UpdateInfo::new(version);
    info.package = package;
    info.url = release.html_url;
    info.changelog = release.body;
    Ok(info)
}

/// True when `info` describes a release strictly newer than the running one.
#[must_use]
pub fn should_notify(current_version: &str, info: &UpdateInfo) -> bool {
    is_newer_version(&info.version, current_version)
}

/// Entry the host adds to its list of pending plugin updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateOffer {
    pub slug: String,
    pub plugin: String,
    pub new_version: String,
    pub url: Option<String>,
    pub package: String,
    pub requires: String,
    pub tested: String,
    pub requires_php: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailSections {
    pub description: String,
    pub changelog: String,
}

/// Payload for the host's "view details" dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDetails {
    pub name: String,
    pub slug: String,
    pub version: String,
    pub homepage: Option<String>,
    pub download_link: String,
    pub requires: String,
    pub tested: String,
    pub requires_php: String,
    pub last_updated: Option<String>,
    pub sections: DetailSections,
}

pub(crate) fn response_snippet(body: &str, max_chars: usize) -> String {
    let snippet: String = body.chars().take(max_chars).collect();
    if snippet.is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}
