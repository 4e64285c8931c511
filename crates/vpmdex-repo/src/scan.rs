//! Release scan orchestration
//!
//! Lists releases once and routes every publishable one to the channels
//! that accept it. Releases are processed one at a time in provider order;
//! the channel stores are only written after the whole scan succeeded.

use crate::checksum::ChecksumResolver;
use crate::config::ScanConfig;
use crate::error::Result;
use crate::http::SecureHttpClient;
use crate::metadata::{LazyMetadata, MetadataResolver};
use crate::release::{GithubReleases, Release, ReleaseSource};
use crate::selector::select_candidate;
use crate::store::{AddOutcome, RepositoryStore};

/// Which releases a channel publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Stable,
    Prerelease,
}

impl ChannelKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChannelKind::Stable => "stable",
            ChannelKind::Prerelease => "prerelease",
        }
    }
}

/// Per-channel counters for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelReport {
    pub kind: ChannelKind,
    pub path: std::path::PathBuf,
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl ChannelReport {
    fn record(&mut self, outcome: AddOutcome) {
        match outcome {
            AddOutcome::Added => self.added += 1,
            AddOutcome::Updated => self.updated += 1,
            AddOutcome::Unchanged => self.unchanged += 1,
            AddOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    /// Whether the run changed this channel's document
    pub fn changed(&self) -> bool {
        self.added + self.updated > 0
    }
}

/// Summary of a scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub releases: usize,
    pub drafts: usize,
    pub incomplete: usize,
    pub channels: Vec<ChannelReport>,
}

struct Channel {
    kind: ChannelKind,
    store: RepositoryStore,
}

/// Drives one index generation run
pub struct Scanner {
    package: String,
    metadata: MetadataResolver,
    channels: Vec<Channel>,
    prereleases_in_stable: bool,
}

impl Scanner {
    pub fn new(
        package: impl Into<String>,
        metadata: MetadataResolver,
        stable: RepositoryStore,
        prerelease: Option<RepositoryStore>,
    ) -> Self {
        let mut channels = vec![Channel {
            kind: ChannelKind::Stable,
            store: stable,
        }];
        if let Some(store) = prerelease {
            channels.push(Channel {
                kind: ChannelKind::Prerelease,
                store,
            });
        }

        Self {
            package: package.into(),
            metadata,
            channels,
            prereleases_in_stable: false,
        }
    }

    /// Publish prerelease releases in the stable channel as well
    pub fn with_prereleases_in_stable(mut self, include: bool) -> Self {
        self.prereleases_in_stable = include;
        self
    }

    /// Build the scanner and its release source from configuration
    pub fn from_config(config: &ScanConfig) -> Result<(Self, GithubReleases)> {
        config.validate()?;

        let client = SecureHttpClient::public()?;
        let checksums = ChecksumResolver::new(client.clone());
        let metadata = MetadataResolver::new(client, config.documentation_url.clone());

        let stable = RepositoryStore::open(
            config.stable_path(),
            config.stable.init(),
            checksums.clone(),
        )?;
        let prerelease = match (&config.prerelease, config.prerelease_path()) {
            (Some(channel), Some(path)) => {
                Some(RepositoryStore::open(path, channel.init(), checksums)?)
            }
            _ => None,
        };

        let source = GithubReleases::new(config.slug()?, &config.api_url, config.credentials()?)?;
        let scanner = Scanner::new(config.package.clone(), metadata, stable, prerelease)
            .with_prereleases_in_stable(config.prereleases_in_stable());

        Ok((scanner, source))
    }

    /// Store of the given channel
    pub fn store(&self, kind: ChannelKind) -> Option<&RepositoryStore> {
        self.channels
            .iter()
            .find(|channel| channel.kind == kind)
            .map(|channel| &channel.store)
    }

    fn accepts(&self, kind: ChannelKind, release: &Release) -> bool {
        match kind {
            ChannelKind::Stable => !release.prerelease || self.prereleases_in_stable,
            ChannelKind::Prerelease => true,
        }
    }

    /// Merge every release from `source` into the channel documents
    ///
    /// Nothing is written to disk; call [`Scanner::save`] afterwards.
    pub async fn scan(&mut self, source: &dyn ReleaseSource) -> Result<ScanReport> {
        tracing::info!("Scanning releases of {}", source.repository());
        let releases = source.list_releases().await?;

        let mut report = ScanReport {
            releases: releases.len(),
            channels: self
                .channels
                .iter()
                .map(|channel| ChannelReport {
                    kind: channel.kind,
                    path: channel.store.path().to_path_buf(),
                    added: 0,
                    updated: 0,
                    unchanged: 0,
                    skipped: 0,
                })
                .collect(),
            ..Default::default()
        };

        for release in &releases {
            if release.draft {
                tracing::debug!("Skipping draft release {}", release.name);
                report.drafts += 1;
                continue;
            }

            let Some(candidate) = select_candidate(release, &self.package) else {
                tracing::warn!(
                    "Release {} is missing package.json or package zip file",
                    release.name
                );
                report.incomplete += 1;
                continue;
            };

            let archive = candidate.archive_ref();
            let lazy = LazyMetadata::new(&self.metadata, &candidate);
            let accepted: Vec<bool> = self
                .channels
                .iter()
                .map(|channel| self.accepts(channel.kind, release))
                .collect();

            for ((channel, channel_report), accepted) in self
                .channels
                .iter_mut()
                .zip(report.channels.iter_mut())
                .zip(accepted)
            {
                if !accepted {
                    continue;
                }

                let repo_url = channel.store.url().to_string();
                let outcome = channel
                    .store
                    .add_package(&self.package, candidate.version(), &archive, || {
                        lazy.for_channel(&repo_url)
                    })
                    .await?;
                channel_report.record(outcome);
            }
        }

        Ok(report)
    }

    /// Write every channel document
    pub fn save(&self) -> Result<()> {
        for channel in &self.channels {
            channel.store.save()?;
        }
        Ok(())
    }

    /// Scan and, if every release merged cleanly, save
    pub async fn run(mut self, source: &dyn ReleaseSource) -> Result<ScanReport> {
        let report = self.scan(source).await?;
        self.save()?;
        Ok(report)
    }
}
