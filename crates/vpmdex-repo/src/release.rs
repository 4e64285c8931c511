//! Release listing
//!
//! Releases are described in a provider-agnostic shape. The GitHub REST API
//! is the only provider implemented.

use async_trait::async_trait;
use serde::Deserialize;

use crate::credentials::{ResolvedCredentials, ScopedCredentials};
use crate::error::{RepoError, Result};
use crate::http::SecureHttpClient;

/// Default GitHub REST API endpoint
pub const GITHUB_API_URL: &str = "https://api.github.com";

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const PER_PAGE: u32 = 100;

/// A tagged publication with downloadable assets
#[derive(Debug, Clone, Default)]
pub struct Release {
    pub name: String,
    pub tag: String,
    pub html_url: Option<String>,
    pub draft: bool,
    pub prerelease: bool,
    pub assets: Vec<ReleaseAsset>,
}

/// A file attached to a release
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub download_url: String,
    /// Provider content digest of the form `<algorithm>:<hex>`
    pub digest: Option<String>,
}

impl ReleaseAsset {
    pub fn new(name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            download_url: download_url.into(),
            digest: None,
        }
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }
}

/// Source of releases for one repository
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Repository identifier, used in messages
    fn repository(&self) -> &str;

    /// List every release in provider order
    async fn list_releases(&self) -> Result<Vec<Release>>;
}

/// `owner/name` identifier of a GitHub repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySlug {
    pub owner: String,
    pub name: String,
}

impl RepositorySlug {
    pub fn parse(slug: &str) -> Result<Self> {
        match slug.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(RepoError::InvalidConfig {
                message: format!("Repository must be in the form owner/name, got '{}'", slug),
            }),
        }
    }
}

impl std::fmt::Display for RepositorySlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Releases listed through the GitHub REST API
pub struct GithubReleases {
    slug: RepositorySlug,
    display: String,
    api_url: String,
    client: SecureHttpClient,
}

impl GithubReleases {
    /// Create a provider for `slug`; credentials are only sent to `api_url`
    pub fn new(
        slug: RepositorySlug,
        api_url: &str,
        credentials: Option<ResolvedCredentials>,
    ) -> Result<Self> {
        let api_url = api_url.trim_end_matches('/').to_string();
        let mut scoped = ScopedCredentials::default();
        if let Some(credentials) = credentials {
            scoped.add(&api_url, credentials);
        }

        Ok(Self {
            display: slug.to_string(),
            slug,
            api_url,
            client: SecureHttpClient::new(scoped)?,
        })
    }

    fn first_page_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases?per_page={}",
            self.api_url, self.slug.owner, self.slug.name, PER_PAGE
        )
    }

    async fn fetch_page(&self, url: &str) -> Result<(Vec<GithubRelease>, Option<String>)> {
        tracing::debug!("Fetching releases page {}", url);
        let response = self.client.get_with_accept(url, Some(GITHUB_ACCEPT)).await?;

        let next = response
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(next_link);

        let page = response
            .json::<Vec<GithubRelease>>()
            .await
            .map_err(|e| RepoError::ReleaseListing {
                repository: self.display.clone(),
                message: format!("Invalid release payload: {}", e),
            })?;

        Ok((page, next))
    }
}

#[async_trait]
impl ReleaseSource for GithubReleases {
    fn repository(&self) -> &str {
        &self.display
    }

    async fn list_releases(&self) -> Result<Vec<Release>> {
        let mut releases = Vec::new();
        let mut next = Some(self.first_page_url());

        while let Some(url) = next {
            let (page, next_url) = self.fetch_page(&url).await?;
            releases.extend(page.into_iter().map(Release::from));
            next = next_url;
        }

        tracing::info!("Found {} releases in {}", releases.len(), self.display);
        Ok(releases)
    }
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header
fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut segments = part.split(';');
        let target = segments.next()?.trim();
        let is_next = segments.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

#[derive(Debug, Deserialize)]
struct GithubRelease {
    name: Option<String>,
    tag_name: String,
    html_url: Option<String>,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    browser_download_url: String,
    #[serde(default)]
    digest: Option<String>,
}

impl From<GithubRelease> for Release {
    fn from(release: GithubRelease) -> Self {
        Release {
            name: release
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| release.tag_name.clone()),
            tag: release.tag_name,
            html_url: release.html_url,
            draft: release.draft,
            prerelease: release.prerelease,
            assets: release
                .assets
                .into_iter()
                .map(|asset| ReleaseAsset {
                    name: asset.name,
                    download_url: asset.browser_download_url,
                    digest: asset.digest,
                })
                .collect(),
        }
    }
}
