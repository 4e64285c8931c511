//! CLI error types with exit code handling

use miette::Diagnostic;
use thiserror::Error;
use vpmdex_repo::RepoError;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Settings are missing or invalid
    #[error("Configuration error: {message}")]
    #[diagnostic(code(vpmdex::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Release provider or download failure
    #[error("Network error: {message}")]
    #[diagnostic(code(vpmdex::cli::network))]
    Network {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Published data contradicts the index
    #[error("Integrity error: {message}")]
    #[diagnostic(
        code(vpmdex::cli::integrity),
        help("Recorded checksums are never rewritten. Publish the changed archive under a new version.")
    )]
    Integrity { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(vpmdex::cli::io))]
    Io { message: String },

    #[error("{message}")]
    #[diagnostic(code(vpmdex::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Network { .. } => exit_codes::NETWORK_ERROR,
            CliError::Integrity { .. } => exit_codes::INTEGRITY_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a configuration error with help text
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        let message = err.to_string();
        match err {
            RepoError::InvalidConfig { .. } | RepoError::InvalidRepositoryUrl { .. } => {
                CliError::Config {
                    message,
                    help: Some("Check vpmdex.yaml and the command line flags".to_string()),
                }
            }
            RepoError::IndexParseError { .. } => CliError::Config {
                message,
                help: Some("Fix or remove the existing index file".to_string()),
            },
            RepoError::ChecksumConflict { .. } => CliError::Integrity { message },
            RepoError::AuthRequired { .. } | RepoError::AuthFailed { .. } => CliError::Network {
                message,
                help: Some("Pass --token or set GITHUB_TOKEN".to_string()),
            },
            RepoError::RateLimited { .. } => CliError::Network {
                message,
                help: Some("Authenticate with a token to raise the rate limit".to_string()),
            },
            RepoError::Io(_) => CliError::Io { message },
            ref other if other.is_network() => CliError::Network {
                message,
                help: None,
            },
            _ => CliError::Other { message },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
