//! vpmdex repository merge engine
//!
//! Builds VPM package listings from GitHub releases:
//!
//! - **Release scan**: paginated listing, draft filtering, prerelease routing
//! - **Candidate selection**: `package.json` plus the `<prefix>*.zip` archive
//! - **Checksums**: provider digest, `.sha256` sidecar, or a local SHA-256
//! - **Merge**: idempotent upserts into the on-disk index, one per channel
//!
//! ## Example
//!
//! ```rust,no_run
//! use vpmdex_repo::{ScanConfig, Scanner};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScanConfig::load_from("vpmdex.yaml".as_ref())?;
//! let (scanner, source) = Scanner::from_config(&config)?;
//! let report = scanner.run(&source).await?;
//! println!("{} releases scanned", report.releases);
//! # Ok(())
//! # }
//! ```
//!
//! ## Integrity
//!
//! - A version's `zipSHA256` is never rewritten once recorded
//! - A release whose `package.json` disagrees with its tag is never indexed
//! - Tokens are scoped to the provider API and never follow redirects

pub mod error;
pub mod credentials;
pub mod http;
pub mod release;
pub mod selector;
pub mod checksum;
pub mod metadata;
pub mod index;
pub mod store;
pub mod config;
pub mod scan;

// Re-exports for convenience
pub use error::{RepoError, Result};
pub use credentials::{Credentials, ResolvedCredentials, ScopedCredentials};
pub use http::SecureHttpClient;
pub use release::{GithubReleases, Release, ReleaseAsset, ReleaseSource, RepositorySlug};
pub use selector::{ArchiveRef, ReleaseCandidate, select_candidate};
pub use checksum::{ChecksumResolver, compute_digest};
pub use metadata::{LazyMetadata, MetadataResolver, PackageMetadata};
pub use index::{PackageVersions, RepositoryDocument, RepositoryInit};
pub use store::{AddOutcome, RepositoryStore, SkipReason};
pub use config::{ChannelConfig, ScanConfig};
pub use scan::{ChannelKind, ChannelReport, ScanReport, Scanner};
