//! Repository store: the merge engine
//!
//! Owns one channel's index document for the duration of a run. Versions
//! are upserted with [`RepositoryStore::add_package`] and the document is
//! written back once with [`RepositoryStore::save`].
//!
//! Guarantees:
//! - packages and versions already in the document are never removed
//! - a recorded `zipSHA256` never changes; a disagreeing digest is an error
//! - re-running against the same releases leaves the document unchanged

use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::checksum::ChecksumResolver;
use crate::error::{RepoError, Result};
use crate::index::{RepositoryDocument, RepositoryInit};
use crate::metadata::PackageMetadata;
use crate::selector::ArchiveRef;

/// Result of a single upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new version was inserted
    Added,
    /// An existing version gained its checksum
    Updated,
    /// The version was already indexed and nothing changed
    Unchanged,
    /// The release was left out of this run
    Skipped(SkipReason),
}

/// Why a release was left out of the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Metadata could not be fetched or parsed
    Metadata,
    /// Metadata names a different package or version than the release
    IdentityMismatch,
}

/// Index document bound to its on-disk location
#[derive(Debug)]
pub struct RepositoryStore {
    path: PathBuf,
    document: RepositoryDocument,
    checksums: ChecksumResolver,
}

impl RepositoryStore {
    /// Load the document at `path`, or seed a new one from `init`
    pub fn open(
        path: impl Into<PathBuf>,
        init: RepositoryInit,
        checksums: ChecksumResolver,
    ) -> Result<Self> {
        let path = path.into();
        let document = if path.exists() {
            tracing::debug!("Loading index {}", path.display());
            RepositoryDocument::load(&path)?
        } else {
            tracing::info!("Creating new index {}", path.display());
            RepositoryDocument::new(init)
        };

        Ok(Self {
            path,
            document,
            checksums,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &RepositoryDocument {
        &self.document
    }

    /// URL of the index this store writes
    pub fn url(&self) -> &str {
        &self.document.url
    }

    /// Add `name@version` if it is new, or confirm it if already indexed
    ///
    /// `provider` is only invoked for versions missing from the document.
    /// Metadata failures and identity mismatches are logged and reported as
    /// [`AddOutcome::Skipped`]; only a checksum conflict is returned as an
    /// error.
    pub async fn add_package<F, Fut>(
        &mut self,
        name: &str,
        version: &str,
        archive: &ArchiveRef,
        provider: F,
    ) -> Result<AddOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PackageMetadata>>,
    {
        if let Some(existing) = self.document.get_version(name, version) {
            let recorded = existing.zip_sha256.clone();
            let checksum = self.reconcile_checksum(name, version, recorded, archive).await?;

            return Ok(match checksum {
                Some(digest) => {
                    if let Some(existing) = self.document.get_version_mut(name, version) {
                        existing.zip_sha256 = Some(digest);
                    }
                    AddOutcome::Updated
                }
                None => AddOutcome::Unchanged,
            });
        }

        tracing::info!("Adding package {}@{} to {}", name, version, self.path.display());

        let mut metadata = match provider().await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::error!("Failed to retrieve package info for {}@{}: {}", name, version, e);
                return Ok(AddOutcome::Skipped(SkipReason::Metadata));
            }
        };

        metadata.default_name(name);

        if let Err(e) = metadata.validate_identity(name, version) {
            tracing::error!("{}", e);
            return Ok(AddOutcome::Skipped(SkipReason::IdentityMismatch));
        }

        if metadata.repo.is_none() {
            metadata.repo = Some(self.document.url.clone());
        }

        let recorded = metadata.zip_sha256.clone();
        if let Some(digest) = self.reconcile_checksum(name, version, recorded, archive).await? {
            metadata.zip_sha256 = Some(digest);
        }

        self.document.insert_version(name, version, metadata);
        Ok(AddOutcome::Added)
    }

    /// Bring a version's checksum in line with the archive
    ///
    /// Returns the digest to record when none is recorded yet. A recorded
    /// digest is only compared against sources that need no archive
    /// download.
    async fn reconcile_checksum(
        &self,
        name: &str,
        version: &str,
        recorded: Option<String>,
        archive: &ArchiveRef,
    ) -> Result<Option<String>> {
        let Some(recorded) = recorded else {
            return match self.checksums.resolve(archive).await {
                Ok(digest) => {
                    tracing::info!("Computed SHA256 for {}: {}", archive.url, digest);
                    Ok(Some(digest))
                }
                Err(e) => {
                    tracing::warn!("Failed to compute SHA256 for {}: {}", archive.url, e);
                    Ok(None)
                }
            };
        };

        let fresh = match self.checksums.verify_cheap(archive).await {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::warn!("Could not verify SHA256 of {}@{}: {}", name, version, e);
                None
            }
        };

        match fresh {
            Some(computed) if !computed.eq_ignore_ascii_case(&recorded) => {
                Err(RepoError::ChecksumConflict {
                    name: name.to_string(),
                    version: version.to_string(),
                    recorded,
                    computed,
                })
            }
            _ => Ok(None),
        }
    }

    /// Write the document back to its path
    ///
    /// The file is replaced atomically through a temporary file in the same
    /// directory.
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let json = self.document.to_json_pretty()?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;

        tracing::info!(
            "Saved {} ({} versions)",
            self.path.display(),
            self.document.version_count()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::SecureHttpClient;
    use std::future::Ready;

    const DIGEST_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const DIGEST_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn init() -> RepositoryInit {
        RepositoryInit {
            author: "Example".to_string(),
            name: "Example Listing".to_string(),
            id: None,
            url: "https://example.com/index.json".to_string(),
        }
    }

    fn store_at(dir: &Path) -> RepositoryStore {
        let checksums = ChecksumResolver::new(SecureHttpClient::public().unwrap());
        RepositoryStore::open(dir.join("index.json"), init(), checksums).unwrap()
    }

    fn provide(metadata: PackageMetadata) -> impl FnOnce() -> Ready<Result<PackageMetadata>> {
        move || std::future::ready(Ok(metadata))
    }

    fn never_fetched() -> Ready<Result<PackageMetadata>> {
        panic!("metadata must not be fetched for indexed versions")
    }

    fn archive(digest: &str) -> ArchiveRef {
        ArchiveRef::new("https://example.invalid/pkg.zip")
            .with_provider_digest(format!("sha256:{}", digest))
    }

    #[tokio::test]
    async fn test_new_version_is_added() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_at(dir.path());

        let outcome = store
            .add_package(
                "com.example.pkg",
                "1.0.0",
                &archive(DIGEST_A),
                provide(PackageMetadata {
                    name: None,
                    ..PackageMetadata::new("", "1.0.0")
                }),
            )
            .await
            .unwrap();

        assert_eq!(outcome, AddOutcome::Added);
        let stored = store.document().get_version("com.example.pkg", "1.0.0").unwrap();
        assert_eq!(stored.name.as_deref(), Some("com.example.pkg"));
        assert_eq!(stored.repo.as_deref(), Some("https://example.com/index.json"));
        assert_eq!(stored.zip_sha256.as_deref(), Some(DIGEST_A));
    }

    #[tokio::test]
    async fn test_existing_version_skips_provider() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_at(dir.path());
        let mut existing = PackageMetadata::new("com.example.pkg", "1.0.0");
        existing.zip_sha256 = Some(DIGEST_A.to_string());
        store.document.insert_version("com.example.pkg", "1.0.0", existing);

        let outcome = store
            .add_package("com.example.pkg", "1.0.0", &archive(DIGEST_A), never_fetched)
            .await
            .unwrap();
        assert_eq!(outcome, AddOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_missing_checksum_is_filled_in() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_at(dir.path());
        store.document.insert_version(
            "com.example.pkg",
            "1.0.0",
            PackageMetadata::new("com.example.pkg", "1.0.0"),
        );

        let outcome = store
            .add_package("com.example.pkg", "1.0.0", &archive(DIGEST_A), never_fetched)
            .await
            .unwrap();

        assert_eq!(outcome, AddOutcome::Updated);
        let stored = store.document().get_version("com.example.pkg", "1.0.0").unwrap();
        assert_eq!(stored.zip_sha256.as_deref(), Some(DIGEST_A));
    }

    #[tokio::test]
    async fn test_conflicting_checksum_in_source_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_at(dir.path());

        let mut metadata = PackageMetadata::new("com.example.pkg", "1.0.0");
        metadata.zip_sha256 = Some(DIGEST_A.to_string());

        let err = store
            .add_package("com.example.pkg", "1.0.0", &archive(DIGEST_B), provide(metadata))
            .await
            .unwrap_err();

        assert!(matches!(err, RepoError::ChecksumConflict { .. }));
        assert!(store.document().get_version("com.example.pkg", "1.0.0").is_none());
    }

    #[tokio::test]
    async fn test_save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_at(dir.path());
        store
            .add_package(
                "com.example.pkg",
                "1.0.0",
                &archive(DIGEST_A),
                provide(PackageMetadata::new("com.example.pkg", "1.0.0")),
            )
            .await
            .unwrap();
        store.save().unwrap();

        let reopened = store_at(dir.path());
        assert_eq!(reopened.document(), store.document());

        let on_disk = std::fs::read_to_string(dir.path().join("index.json")).unwrap();
        assert!(on_disk.ends_with("}\n"));
    }

    #[test]
    fn test_open_corrupt_index_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.json"), "{not json").unwrap();

        let checksums = ChecksumResolver::new(SecureHttpClient::public().unwrap());
        let err = RepositoryStore::open(dir.path().join("index.json"), init(), checksums)
            .unwrap_err();
        assert!(matches!(err, RepoError::IndexParseError { .. }));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("site").join("vpm");
        let checksums = ChecksumResolver::new(SecureHttpClient::public().unwrap());
        let store = RepositoryStore::open(nested.join("index.json"), init(), checksums).unwrap();
        store.save().unwrap();
        assert!(nested.join("index.json").exists());
    }
}
