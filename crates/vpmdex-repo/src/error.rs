//! Error types for index generation

use thiserror::Error;

/// Errors raised while scanning releases and merging them into an index
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Configuration Errors ============
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid repository URL: {url} - {reason}")]
    InvalidRepositoryUrl { url: String, reason: String },

    // ============ Network Errors ============
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Rate limited by server. Retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("Authentication required for {url}")]
    AuthRequired { url: String },

    #[error("Authentication failed: {message}")]
    AuthFailed { message: String },

    // ============ Release Provider Errors ============
    #[error("Failed to list releases for {repository}: {message}")]
    ReleaseListing { repository: String, message: String },

    // ============ Metadata Errors ============
    #[error("Malformed package metadata at {url}: {message}")]
    MalformedMetadata { url: String, message: String },

    #[error("Package identity mismatch: expected {expected_name}@{expected_version}, got {actual_name}@{actual_version}")]
    IdentityMismatch {
        expected_name: String,
        expected_version: String,
        actual_name: String,
        actual_version: String,
    },

    // ============ Checksum Errors ============
    #[error("Malformed checksum in {url}: '{token}' is not a SHA-256 hex digest")]
    MalformedChecksum { url: String, token: String },

    #[error("Checksum conflict for {name}@{version}: recorded {recorded}, computed {computed}")]
    ChecksumConflict {
        name: String,
        version: String,
        recorded: String,
        computed: String,
    },

    // ============ Index Errors ============
    #[error("Failed to parse index {path}: {message}")]
    IndexParseError { path: String, message: String },

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for index operations
pub type Result<T> = std::result::Result<T, RepoError>;

impl RepoError {
    /// Whether this error comes from the transport layer
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            RepoError::HttpError { .. }
                | RepoError::NetworkError { .. }
                | RepoError::Timeout { .. }
                | RepoError::RateLimited { .. }
                | RepoError::AuthRequired { .. }
                | RepoError::AuthFailed { .. }
                | RepoError::ReleaseListing { .. }
        )
    }
}

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RepoError::Timeout { seconds: 30 }
        } else if e.is_connect() {
            RepoError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            RepoError::HttpError {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            RepoError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_yaml::Error> for RepoError {
    fn from(e: serde_yaml::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(e: serde_json::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

impl From<url::ParseError> for RepoError {
    fn from(e: url::ParseError) -> Self {
        RepoError::InvalidRepositoryUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}

impl From<tempfile::PersistError> for RepoError {
    fn from(e: tempfile::PersistError) -> Self {
        RepoError::Io(e.error)
    }
}
