//! Scan configuration
//!
//! Settings can come from a YAML file (`vpmdex.yaml`) and are then
//! overridden field by field from the command line.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::credentials::{Credentials, ResolvedCredentials};
use crate::error::{RepoError, Result};
use crate::index::RepositoryInit;
use crate::release::{GITHUB_API_URL, RepositorySlug};

/// Default file name of the stable channel index
pub const STABLE_INDEX_FILE: &str = "index.json";

/// Default file name of the prerelease channel index
pub const PRERELEASE_INDEX_FILE: &str = "index.prerelease.json";

/// Everything one index generation run needs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    /// Directory the channel index files are written to
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Source repository as `owner/name`
    #[serde(default)]
    pub repository: String,

    /// Package name, also the archive file name prefix
    #[serde(default)]
    pub package: String,

    /// Release provider access token
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Environment variable holding the access token, used when `token`
    /// is not set
    #[serde(default)]
    pub token_env: Option<String>,

    /// Release provider API endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Documentation link stamped onto every new version
    #[serde(default)]
    pub documentation_url: Option<String>,

    /// Merge prereleases into the stable channel when no prerelease
    /// channel is configured
    #[serde(default)]
    pub include_prereleases: bool,

    /// Stable channel
    #[serde(default)]
    pub stable: ChannelConfig,

    /// Optional prerelease channel
    #[serde(default)]
    pub prerelease: Option<ChannelConfig>,
}

fn default_output() -> PathBuf {
    PathBuf::from(".")
}

fn default_api_url() -> String {
    GITHUB_API_URL.to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            repository: String::new(),
            package: String::new(),
            token: None,
            token_env: None,
            api_url: default_api_url(),
            documentation_url: None,
            include_prereleases: false,
            stable: ChannelConfig::default(),
            prerelease: None,
        }
    }
}

impl ScanConfig {
    /// Load configuration from a YAML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parsed source repository
    pub fn slug(&self) -> Result<RepositorySlug> {
        RepositorySlug::parse(&self.repository)
    }

    /// Credentials for the release provider, if any are configured
    pub fn credentials(&self) -> Result<Option<ResolvedCredentials>> {
        let credentials = match (&self.token, &self.token_env) {
            (Some(token), _) if !token.is_empty() => Credentials::bearer(token),
            (_, Some(var)) if !var.is_empty() => Credentials::from_env(var),
            _ => return Ok(None),
        };
        credentials.resolve().map(Some)
    }

    /// Index file of the stable channel
    pub fn stable_path(&self) -> PathBuf {
        self.output.join(self.stable.file_or(STABLE_INDEX_FILE))
    }

    /// Index file of the prerelease channel, if one is configured
    pub fn prerelease_path(&self) -> Option<PathBuf> {
        self.prerelease
            .as_ref()
            .map(|channel| self.output.join(channel.file_or(PRERELEASE_INDEX_FILE)))
    }

    /// Whether prerelease releases belong in the stable channel
    pub fn prereleases_in_stable(&self) -> bool {
        self.include_prereleases && self.prerelease.is_none()
    }

    /// Check the configuration before any network access
    pub fn validate(&self) -> Result<()> {
        self.slug()?;

        if self.package.trim().is_empty() {
            return Err(RepoError::InvalidConfig {
                message: "Package name must not be empty".to_string(),
            });
        }

        validate_url("API", &self.api_url)?;
        self.stable.validate("stable")?;
        if let Some(prerelease) = &self.prerelease {
            prerelease.validate("prerelease")?;
        }
        if let Some(docs) = self.documentation_url.as_deref().filter(|d| !d.is_empty()) {
            validate_url("documentation", docs)?;
        }

        Ok(())
    }
}

/// Identity and location of one channel's index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    /// Public URL the index is served from
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub id: Option<String>,

    /// File name inside the output directory
    #[serde(default)]
    pub file: Option<String>,
}

impl ChannelConfig {
    fn file_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.file.as_deref().filter(|f| !f.is_empty()).unwrap_or(default)
    }

    /// Identity used when the channel's index does not exist yet
    pub fn init(&self) -> RepositoryInit {
        RepositoryInit {
            author: self.author.clone(),
            name: self.name.clone(),
            id: self.id.clone().filter(|id| !id.is_empty()),
            url: self.url.clone(),
        }
    }

    fn validate(&self, channel: &str) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(RepoError::InvalidConfig {
                message: format!("The {} channel needs an index URL", channel),
            });
        }
        validate_url(channel, &self.url)
    }
}

fn validate_url(what: &str, url: &str) -> Result<()> {
    Url::parse(url).map_err(|e| RepoError::InvalidRepositoryUrl {
        url: url.to_string(),
        reason: format!("invalid {} URL: {}", what, e),
    })?;
    Ok(())
}
