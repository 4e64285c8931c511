//! Archive checksum resolution
//!
//! A SHA-256 digest is taken from the cheapest source available, in order:
//! the provider's content digest, a `.sha256` sidecar asset, or a full
//! download of the archive hashed locally.

use sha2::{Digest, Sha256};

use crate::error::{RepoError, Result};
use crate::http::SecureHttpClient;
use crate::selector::ArchiveRef;

const ALGORITHM: &str = "sha256";
const DIGEST_LEN: usize = 64;

/// Produces SHA-256 digests for package archives
#[derive(Debug, Clone)]
pub struct ChecksumResolver {
    client: SecureHttpClient,
}

impl ChecksumResolver {
    pub fn new(client: SecureHttpClient) -> Self {
        Self { client }
    }

    /// Resolve a digest for `archive`, downloading it as a last resort
    pub async fn resolve(&self, archive: &ArchiveRef) -> Result<String> {
        if !archive.has_hint() {
            tracing::debug!("No published checksum for {}", archive.url);
        } else if let Some(digest) = self.verify_cheap(archive).await? {
            return Ok(digest);
        }

        tracing::debug!("Downloading {} to compute its checksum", archive.url);
        let data = self.client.get_bytes(&archive.url).await?;
        Ok(compute_digest(&data))
    }

    /// Resolve a digest without downloading the archive
    ///
    /// Returns `Ok(None)` when neither a usable provider digest nor a
    /// sidecar is attached to the archive.
    pub async fn verify_cheap(&self, archive: &ArchiveRef) -> Result<Option<String>> {
        if let Some(raw) = archive.provider_digest.as_deref() {
            match provider_digest(raw) {
                Some(digest) => return Ok(Some(digest)),
                None => tracing::debug!("Ignoring provider digest '{}' for {}", raw, archive.url),
            }
        }

        if let Some(sidecar_url) = archive.sidecar_url.as_deref() {
            let text = self.client.get_text(sidecar_url).await?;
            return parse_sidecar(sidecar_url, &text).map(Some);
        }

        Ok(None)
    }
}

/// Hex SHA-256 of `data`
pub fn compute_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Extract the hex part of a `sha256:<hex>` provider digest
fn provider_digest(raw: &str) -> Option<String> {
    let (algorithm, hex) = raw.trim().split_once(':')?;
    if !algorithm.eq_ignore_ascii_case(ALGORITHM) || !is_sha256_hex(hex) {
        return None;
    }
    Some(hex.to_ascii_lowercase())
}

/// Read the first whitespace-delimited token of a sidecar file
fn parse_sidecar(url: &str, text: &str) -> Result<String> {
    let token = text.split_whitespace().next().unwrap_or_default();
    if !is_sha256_hex(token) {
        return Err(RepoError::MalformedChecksum {
            url: url.to_string(),
            token: token.to_string(),
        });
    }
    Ok(token.to_ascii_lowercase())
}

fn is_sha256_hex(s: &str) -> bool {
    s.len() == DIGEST_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}
