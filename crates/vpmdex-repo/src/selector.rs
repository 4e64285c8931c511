//! Picks the publishable files out of a release

use crate::release::{Release, ReleaseAsset};

/// Name of the metadata asset every publishable release carries
pub const METADATA_ASSET: &str = "package.json";

/// Suffix appended to an archive name to form its checksum sidecar
pub const SIDECAR_SUFFIX: &str = ".sha256";

const ARCHIVE_EXTENSION: &str = ".zip";

/// Archive download location plus the cheaper digest sources attached to it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveRef {
    pub url: String,
    /// Digest string supplied by the provider, e.g. `sha256:<hex>`
    pub provider_digest: Option<String>,
    /// URL of a sidecar text file holding the digest
    pub sidecar_url: Option<String>,
}

impl ArchiveRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_provider_digest(mut self, digest: impl Into<String>) -> Self {
        self.provider_digest = Some(digest.into());
        self
    }

    pub fn with_sidecar(mut self, url: impl Into<String>) -> Self {
        self.sidecar_url = Some(url.into());
        self
    }

    /// Whether a digest can be obtained without downloading the archive
    pub fn has_hint(&self) -> bool {
        self.provider_digest.is_some() || self.sidecar_url.is_some()
    }
}

/// A release with its metadata and archive assets located
#[derive(Debug, Clone)]
pub struct ReleaseCandidate<'a> {
    pub release: &'a Release,
    pub metadata: &'a ReleaseAsset,
    pub archive: &'a ReleaseAsset,
    pub sidecar: Option<&'a ReleaseAsset>,
    pub prerelease: bool,
}

impl<'a> ReleaseCandidate<'a> {
    /// Version string for this candidate (the release tag)
    pub fn version(&self) -> &str {
        &self.release.tag
    }

    /// Archive reference handed to the store
    pub fn archive_ref(&self) -> ArchiveRef {
        ArchiveRef {
            url: self.archive.download_url.clone(),
            provider_digest: self.archive.digest.clone().filter(|d| !d.is_empty()),
            sidecar_url: self.sidecar.map(|asset| asset.download_url.clone()),
        }
    }
}

/// Locate the metadata and archive assets of `release`
///
/// Returns `None` when either asset is missing. When several assets qualify
/// as the archive, the last one listed wins.
pub fn select_candidate<'a>(release: &'a Release, prefix: &str) -> Option<ReleaseCandidate<'a>> {
    let mut metadata = None;
    let mut archive = None;

    for asset in &release.assets {
        if asset.name == METADATA_ASSET {
            metadata = Some(asset);
        }
        if asset.name.starts_with(prefix) && asset.name.ends_with(ARCHIVE_EXTENSION) {
            archive = Some(asset);
        }
    }

    let (metadata, archive) = (metadata?, archive?);

    let sidecar_name = format!("{}{}", archive.name, SIDECAR_SUFFIX);
    let sidecar = release.assets.iter().find(|asset| asset.name == sidecar_name);

    Some(ReleaseCandidate {
        release,
        metadata,
        archive,
        sidecar,
        prerelease: release.prerelease,
    })
}
