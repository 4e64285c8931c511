//! Persisted index document
//!
//! VPM-compatible repository listing: package name → versions → metadata.
//! Maps keep their file order so an unchanged document re-serialises to the
//! same bytes.

use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{RepoError, Result};
use crate::metadata::PackageMetadata;

/// Identity fields used to seed a new channel document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryInit {
    pub author: String,
    pub name: String,
    pub id: Option<String>,
    pub url: String,
}

/// One channel's index document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryDocument {
    /// Packages indexed by name
    #[serde(default)]
    pub packages: IndexMap<String, PackageVersions>,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "is_empty_id")]
    pub id: Option<String>,

    #[serde(default)]
    pub url: String,

    /// Top-level fields this tool does not manage
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

fn is_empty_id(id: &Option<String>) -> bool {
    id.as_deref().is_none_or(str::is_empty)
}

impl RepositoryDocument {
    /// Seed an empty document from channel identity
    pub fn new(init: RepositoryInit) -> Self {
        Self {
            packages: IndexMap::new(),
            author: init.author,
            name: init.name,
            id: init.id.filter(|id| !id.is_empty()),
            url: init.url,
            extra: IndexMap::new(),
        }
    }

    /// Parse a document from JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Load a document from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| RepoError::IndexParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Pretty-printed JSON with a trailing newline
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Get a specific version of a package
    pub fn get_version(&self, name: &str, version: &str) -> Option<&PackageMetadata> {
        self.packages.get(name)?.versions.get(version)
    }

    /// Mutable access to a specific version of a package
    pub fn get_version_mut(&mut self, name: &str, version: &str) -> Option<&mut PackageMetadata> {
        self.packages.get_mut(name)?.versions.get_mut(version)
    }

    /// Insert a version, creating the package entry if needed
    pub fn insert_version(&mut self, name: &str, version: &str, metadata: PackageMetadata) {
        self.packages
            .entry(name.to_string())
            .or_default()
            .versions
            .insert(version.to_string(), metadata);
    }

    /// Total number of versions across all packages
    pub fn version_count(&self) -> usize {
        self.packages.values().map(|p| p.versions.len()).sum()
    }
}

/// All indexed versions of one package
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageVersions {
    #[serde(default)]
    pub versions: IndexMap<String, PackageMetadata>,

    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl PackageVersions {
    /// Versions ordered by semver, non-semver strings last in lexical order
    pub fn sorted(&self) -> Vec<(&str, &PackageMetadata)> {
        let mut versions: Vec<_> = self
            .versions
            .iter()
            .map(|(v, m)| (v.as_str(), m))
            .collect();
        versions.sort_by(|(a, _), (b, _)| {
            match (Version::parse(a).ok(), Version::parse(b).ok()) {
                (Some(va), Some(vb)) => va.cmp(&vb),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.cmp(b),
            }
        });
        versions
    }

    /// Highest semver version
    pub fn latest(&self) -> Option<&str> {
        self.versions
            .keys()
            .filter_map(|v| Version::parse(v).ok().map(|parsed| (parsed, v.as_str())))
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, v)| v)
    }
}
