//! Package metadata records and their resolution from release assets

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use crate::error::{RepoError, Result};
use crate::http::SecureHttpClient;
use crate::selector::ReleaseCandidate;

/// Marker appended to archive URLs so clients do not reuse a cached download
pub const URL_CACHE_MARKER: &str = "?";

/// Metadata of one package version, as stored in the index
///
/// Well-known fields are typed when they hold strings. Any other value,
/// including `null` or a value of another JSON type under a well-known key,
/// is kept verbatim in `extra`, so foreign records survive a load and save
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "IndexMap<String, Value>", into = "IndexMap<String, Value>")]
pub struct PackageMetadata {
    pub name: Option<String>,
    pub version: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// Archive download location
    pub url: Option<String>,
    /// URL of the index that owns this record
    pub repo: Option<String>,
    /// SHA-256 of the archive; immutable once recorded
    pub zip_sha256: Option<String>,
    pub documentation_url: Option<String>,
    pub changelog_url: Option<String>,
    pub extra: IndexMap<String, Value>,
}

impl PackageMetadata {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            version: Some(version.into()),
            ..Default::default()
        }
    }

    /// Build a record from a parsed JSON object
    pub fn from_object(object: Map<String, Value>) -> Self {
        Self::from(object.into_iter().collect::<IndexMap<_, _>>())
    }

    fn string_field_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            "name" => Some(&mut self.name),
            "version" => Some(&mut self.version),
            "displayName" => Some(&mut self.display_name),
            "description" => Some(&mut self.description),
            "url" => Some(&mut self.url),
            "repo" => Some(&mut self.repo),
            "zipSHA256" => Some(&mut self.zip_sha256),
            "documentationUrl" => Some(&mut self.documentation_url),
            "changelogUrl" => Some(&mut self.changelog_url),
            _ => None,
        }
    }

    /// Fill in `name` when the source left it out or set it to `null`
    pub fn default_name(&mut self, name: &str) {
        if self.name.is_none() && self.extra.get("name").is_none_or(Value::is_null) {
            self.extra.shift_remove("name");
            self.name = Some(name.to_string());
        }
    }

    /// Check that this record is filed under `name@version`
    pub fn validate_identity(&self, name: &str, version: &str) -> Result<()> {
        if self.name.as_deref() == Some(name) && self.version.as_deref() == Some(version) {
            return Ok(());
        }
        let raw = |typed: &Option<String>, key: &str| {
            typed
                .clone()
                .or_else(|| self.extra.get(key).map(Value::to_string))
                .unwrap_or_default()
        };
        Err(RepoError::IdentityMismatch {
            expected_name: name.to_string(),
            expected_version: version.to_string(),
            actual_name: raw(&self.name, "name"),
            actual_version: raw(&self.version, "version"),
        })
    }
}

impl From<IndexMap<String, Value>> for PackageMetadata {
    fn from(fields: IndexMap<String, Value>) -> Self {
        let mut metadata = Self::default();
        for (key, value) in fields {
            if let Value::String(text) = &value {
                if let Some(slot) = metadata.string_field_mut(&key) {
                    *slot = Some(text.clone());
                    continue;
                }
            }
            metadata.extra.insert(key, value);
        }
        metadata
    }
}

impl From<PackageMetadata> for IndexMap<String, Value> {
    fn from(metadata: PackageMetadata) -> Self {
        let PackageMetadata {
            name,
            version,
            display_name,
            description,
            url,
            repo,
            zip_sha256,
            documentation_url,
            changelog_url,
            extra,
        } = metadata;

        let typed = [
            ("name", name),
            ("version", version),
            ("displayName", display_name),
            ("description", description),
            ("url", url),
            ("repo", repo),
            ("zipSHA256", zip_sha256),
            ("documentationUrl", documentation_url),
            ("changelogUrl", changelog_url),
        ];

        let mut fields = IndexMap::new();
        for (key, value) in typed {
            if let Some(value) = value {
                fields.insert(key.to_string(), Value::String(value));
            }
        }
        // A typed value wins over a raw one stored under the same key
        for (key, value) in extra {
            fields.entry(key).or_insert(value);
        }
        fields
    }
}

/// Fetches `package.json` assets and stamps distribution fields onto them
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    client: SecureHttpClient,
    documentation_url: Option<String>,
}

impl MetadataResolver {
    pub fn new(client: SecureHttpClient, documentation_url: Option<String>) -> Self {
        Self {
            client,
            documentation_url: documentation_url.filter(|u| !u.is_empty()),
        }
    }

    /// Fetch a metadata asset and parse it as a JSON object
    pub async fn fetch(&self, url: &str) -> Result<Map<String, Value>> {
        let bytes = self.client.get_bytes(url).await?;
        let value: Value =
            serde_json::from_slice(&bytes).map_err(|e| RepoError::MalformedMetadata {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        match value {
            Value::Object(object) => Ok(object),
            other => Err(RepoError::MalformedMetadata {
                url: url.to_string(),
                message: format!("expected a JSON object, got {}", other),
            }),
        }
    }

    /// Stamp distribution fields onto a parsed metadata object
    pub fn stamp(&self, object: Map<String, Value>, target: &StampTarget<'_>) -> PackageMetadata {
        let mut metadata = PackageMetadata::from_object(object);

        metadata.url = Some(cache_busting_url(target.archive_url));
        metadata.repo = Some(target.repo_url.to_string());
        if let Some(docs) = &self.documentation_url {
            metadata.documentation_url = Some(docs.clone());
        }
        if let Some(changelog) = target.changelog_url {
            metadata.changelog_url = Some(changelog.to_string());
        }

        metadata
    }
}

/// Per-channel values stamped onto a metadata record
#[derive(Debug, Clone, Copy)]
pub struct StampTarget<'a> {
    pub archive_url: &'a str,
    pub repo_url: &'a str,
    pub changelog_url: Option<&'a str>,
}

fn cache_busting_url(url: &str) -> String {
    if url.contains('?') {
        url.to_string()
    } else {
        format!("{}{}", url, URL_CACHE_MARKER)
    }
}

/// Deferred metadata for one release
///
/// Creating it costs nothing. The asset is fetched the first time a channel
/// asks for it; every later request reuses that result.
pub struct LazyMetadata<'a> {
    resolver: &'a MetadataResolver,
    metadata_url: String,
    archive_url: String,
    changelog_url: Option<String>,
    fetched: OnceCell<std::result::Result<Map<String, Value>, RepoError>>,
}

impl<'a> LazyMetadata<'a> {
    pub fn new(resolver: &'a MetadataResolver, candidate: &ReleaseCandidate<'_>) -> Self {
        Self {
            resolver,
            metadata_url: candidate.metadata.download_url.clone(),
            archive_url: candidate.archive.download_url.clone(),
            changelog_url: candidate.release.html_url.clone(),
            fetched: OnceCell::new(),
        }
    }

    /// Whether the metadata asset has been requested yet
    pub fn is_fetched(&self) -> bool {
        self.fetched.initialized()
    }

    /// Stamped metadata for the channel whose index lives at `repo_url`
    pub async fn for_channel(&self, repo_url: &str) -> Result<PackageMetadata> {
        let fetched = self
            .fetched
            .get_or_init(|| async {
                tracing::debug!("Fetching package metadata from {}", self.metadata_url);
                self.resolver.fetch(&self.metadata_url).await
            })
            .await;

        let object = fetched
            .as_ref()
            .map_err(|e| replay_failure(&self.metadata_url, e))?
            .clone();

        Ok(self.resolver.stamp(
            object,
            &StampTarget {
                archive_url: &self.archive_url,
                repo_url,
                changelog_url: self.changelog_url.as_deref(),
            },
        ))
    }
}

/// Rebuild a cached fetch failure for another channel, keeping its class
fn replay_failure(url: &str, err: &RepoError) -> RepoError {
    match err {
        RepoError::HttpError { status, message } => RepoError::HttpError {
            status: *status,
            message: message.clone(),
        },
        RepoError::Timeout { seconds } => RepoError::Timeout { seconds: *seconds },
        RepoError::RateLimited { retry_after } => RepoError::RateLimited {
            retry_after: *retry_after,
        },
        RepoError::AuthRequired { url } => RepoError::AuthRequired { url: url.clone() },
        RepoError::MalformedMetadata { url, message } => RepoError::MalformedMetadata {
            url: url.clone(),
            message: message.clone(),
        },
        other if other.is_network() => RepoError::NetworkError {
            message: other.to_string(),
        },
        other => RepoError::MalformedMetadata {
            url: url.to_string(),
            message: other.to_string(),
        },
    }
}
