use crate::config::GithubConfig;
use crate::errors::PublishError;
use async_trait::async_trait;
use http::StatusCode;
use http::header::{AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const AGENT: &str = "pushgate";
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// A create-or-update sent to the content store.
///
/// `sha` carries the revision identifier of the file being replaced; its
/// presence means "update existing", its absence means "create new". The
/// store rejects updates whose `sha` does not match the current revision.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct FileWrite {
    pub message: String,
    /// Base64-encoded file content
    pub content: String,
    pub branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

/// Current state of an existing remote file
#[derive(Clone, Debug, Deserialize)]
pub struct RemoteFile {
    pub sha: String,
}

/// Links reported by the store after a successful write
#[derive(Clone, Debug, Default)]
pub struct WriteReceipt {
    pub content_url: Option<String>,
    pub commit_url: Option<String>,
}

/// Remote store holding the published files.
///
/// Injected into the publisher so tests can substitute a fake without
/// network access.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch the current revision of `path` on `branch`, or `None` when the
    /// file does not exist yet.
    async fn get(&self, path: &str, branch: &str) -> Result<Option<RemoteFile>, PublishError>;

    /// Create or update `path` with the given write.
    async fn put(&self, path: &str, write: &FileWrite) -> Result<WriteReceipt, PublishError>;
}

#[derive(Deserialize)]
struct HtmlLink {
    html_url: Option<String>,
}

#[derive(Deserialize)]
struct PutResponse {
    content: Option<HtmlLink>,
    commit: Option<HtmlLink>,
}

/// [`ContentStore`] backed by the GitHub contents API
pub struct GithubContentStore {
    client: reqwest::Client,
    api_base: Url,
    owner: String,
    repo: String,
    token: String,
}

impl GithubContentStore {
    pub fn new(
        api_base: Url,
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        GithubContentStore {
            client: reqwest::Client::new(),
            api_base,
            owner: owner.into(),
            repo: repo.into(),
            token: token.into(),
        }
    }

    /// Builds a store from config, or `None` when owner, repo, or token is
    /// missing. The caller decides how to surface the misconfiguration.
    pub fn from_config(config: &GithubConfig) -> Option<Self> {
        let owner = config.owner.clone()?;
        let repo = config.repo.clone()?;
        let token = config.token.clone()?;

        Some(GithubContentStore::new(
            config.api_base.clone(),
            owner,
            repo,
            token,
        ))
    }

    fn contents_url(&self, path: &str) -> Result<Url, PublishError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| PublishError::Internal("API base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repo.as_str(), "contents"])
            .extend(path.split('/').filter(|segment| !segment.is_empty()));

        Ok(url)
    }
}

#[async_trait]
impl ContentStore for GithubContentStore {
    async fn get(&self, path: &str, branch: &str) -> Result<Option<RemoteFile>, PublishError> {
        let mut url = self.contents_url(path)?;
        url.query_pairs_mut().append_pair("ref", branch);

        let response = self
            .client
            .get(url)
            .timeout(UPSTREAM_TIMEOUT)
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(USER_AGENT, AGENT)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let file = response.json::<RemoteFile>().await?;
                Ok(Some(file))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(PublishError::Upstream {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    async fn put(&self, path: &str, write: &FileWrite) -> Result<WriteReceipt, PublishError> {
        let url = self.contents_url(path)?;

        let response = self
            .client
            .put(url)
            .timeout(UPSTREAM_TIMEOUT)
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(USER_AGENT, AGENT)
            .json(write)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = response.json::<PutResponse>().await?;

        Ok(WriteReceipt {
            content_url: parsed.content.and_then(|link| link.html_url),
            commit_url: parsed.commit.and_then(|link| link.html_url),
        })
    }
}
