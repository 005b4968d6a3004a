use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, USER_AGENT};

use crate::config::GitHubRepo;
use crate::update::{
    GitHubRelease, UpdateError, UpdateInfo, info_from_release, parse_manifest, response_snippet,
};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Source of release metadata. Every failure is reported as an
/// [`UpdateError`]; deciding what to do about it is the resolver's job.
#[async_trait]
pub trait ReleaseFetcher: Send + Sync {
    async fn fetch_manifest(&self, url: &str) -> Result<UpdateInfo, UpdateError>;

    async fn fetch_latest_release(&self, repo: &GitHubRepo) -> Result<UpdateInfo, UpdateError>;
}

pub struct HttpReleaseFetcher {
    client: reqwest::Client,
    api_base: String,
    user_agent: String,
}

impl HttpReleaseFetcher {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            api_base: DEFAULT_GITHUB_API_BASE.to_string(),
            user_agent: format!(
                "France-Relocation-Assistant-Updater/{}",
                env!("CARGO_PKG_VERSION")
            ),
        }
    }

    /// Point release lookups at another GitHub-compatible API root.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn latest_release_url(&self, repo: &GitHubRepo) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base,
            repo.owner(),
            repo.name()
        )
    }

    async fn get_ok_body(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<String, UpdateError> {
        let response = request
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|source| UpdateError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body_snippet = response
                .text()
                .await
                .ok()
                .map(|body| response_snippet(&body, 160))
                .unwrap_or_default();
            return Err(UpdateError::HttpStatus {
                url: url.to_string(),
                status,
                body_snippet,
            });
        }

        response.text().await.map_err(|source| UpdateError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl ReleaseFetcher for HttpReleaseFetcher {
    async fn fetch_manifest(&self, url: &str) -> Result<UpdateInfo, UpdateError> {
        debug!("Fetching update manifest from {url}");
        let request = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, &self.user_agent);

        let body = self.get_ok_body(request, url).await?;
        parse_manifest(&body)
    }

    async fn fetch_latest_release(&self, repo: &GitHubRepo) -> Result<UpdateInfo, UpdateError> {
        let url = self.latest_release_url(repo);
        debug!("Fetching latest release for {repo} from {url}");
        let request = self
            .client
            .get(&url)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(USER_AGENT, &self.user_agent);

        let body = self.get_ok_body(request, &url).await?;
        let release: GitHubRelease = serde_json::from_str(&body)
            .map_err(|e| UpdateError::MalformedPayload(e.to_string()))?;
        info_from_release(release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_release_url_uses_api_base() {
        let repo: GitHubRepo = "example/france-relocation-assistant"
            .parse()
            .expect("repo should parse");

        let fetcher = HttpReleaseFetcher::new(reqwest::Client::new());
        assert_eq!(
            fetcher.latest_release_url(&repo),
            "https://api.github.com/repos/example/france-relocation-assistant/releases/latest"
        );

        let fetcher = fetcher.with_api_base("http://127.0.0.1:9000/");
        assert_eq!(
            fetcher.latest_release_url(&repo),
            "http://127.0.0.1:9000/repos/example/france-relocation-assistant/releases/latest"
        );
    }
}
