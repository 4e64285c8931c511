//! Release provider credentials with origin scoping
//!
//! Tokens are bound to the URL prefix of the provider API. Asset downloads
//! usually redirect to a CDN on another origin, and the token must never
//! follow them there.

use std::collections::HashMap;
use url::Url;

use crate::error::{RepoError, Result};

/// Credential sources supported for the release provider
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Literal bearer token
    Bearer { token: String },

    /// Token read from an environment variable at resolve time
    Env { token_var: String },
}

impl Credentials {
    /// Create bearer token credentials
    pub fn bearer(token: impl Into<String>) -> Self {
        Credentials::Bearer {
            token: token.into(),
        }
    }

    /// Create credentials backed by an environment variable
    pub fn from_env(token_var: impl Into<String>) -> Self {
        Credentials::Env {
            token_var: token_var.into(),
        }
    }

    /// Resolve credentials to actual values
    pub fn resolve(&self) -> Result<ResolvedCredentials> {
        match self {
            Credentials::Bearer { token } => Ok(ResolvedCredentials::Bearer {
                token: token.clone(),
            }),
            Credentials::Env { token_var } => {
                let token = std::env::var(token_var).map_err(|_| RepoError::AuthFailed {
                    message: format!("Environment variable {} not set", token_var),
                })?;
                Ok(ResolvedCredentials::Bearer { token })
            }
        }
    }
}

/// Resolved credentials ready for use
#[derive(Debug, Clone)]
pub enum ResolvedCredentials {
    Bearer { token: String },
}

impl ResolvedCredentials {
    /// Authorization header value
    pub fn auth_header(&self) -> String {
        match self {
            ResolvedCredentials::Bearer { token } => format!("Bearer {}", token),
        }
    }
}

/// Maps URL prefixes to credentials
#[derive(Debug, Clone, Default)]
pub struct ScopedCredentials {
    scopes: HashMap<String, ResolvedCredentials>,
}

impl ScopedCredentials {
    /// Add credentials for a URL scope
    pub fn add(&mut self, url_prefix: &str, credentials: ResolvedCredentials) {
        let prefix = url_prefix.trim_end_matches('/').to_string();
        self.scopes.insert(prefix, credentials);
    }

    /// Get credentials for a URL (by longest matching prefix)
    pub fn for_url(&self, url: &str) -> Option<&ResolvedCredentials> {
        self.scopes
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, creds)| creds)
    }

    /// Whether no scope is configured
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Check if two URLs are same-origin (for redirect safety)
    pub fn same_origin(url1: &str, url2: &str) -> bool {
        match (Url::parse(url1), Url::parse(url2)) {
            (Ok(u1), Ok(u2)) => {
                u1.scheme() == u2.scheme()
                    && u1.host() == u2.host()
                    && u1.port_or_known_default() == u2.port_or_known_default()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_origin() {
        assert!(ScopedCredentials::same_origin(
            "https://api.github.com/repos",
            "https://api.github.com/repos/a/b/releases"
        ));
        assert!(ScopedCredentials::same_origin(
            "https://api.github.com:443/foo",
            "https://api.github.com/bar"
        ));
        assert!(!ScopedCredentials::same_origin(
            "https://github.com/a/b/releases/download/1.0.0/pkg.zip",
            "https://objects.githubusercontent.com/pkg.zip"
        ));
        assert!(!ScopedCredentials::same_origin(
            "https://example.com/foo",
            "http://example.com/bar"
        ));
    }

    #[test]
    fn test_scoped_credentials() {
        let mut scoped = ScopedCredentials::default();
        scoped.add(
            "https://api.github.com/",
            ResolvedCredentials::Bearer {
                token: "secret".to_string(),
            },
        );

        assert!(
            scoped
                .for_url("https://api.github.com/repos/owner/repo/releases")
                .is_some()
        );
        assert!(
            scoped
                .for_url("https://github.com/owner/repo/releases/download/1.0.0/package.json")
                .is_none()
        );
    }

    #[test]
    fn test_bearer_header() {
        let resolved = Credentials::bearer("abc").resolve().unwrap();
        assert_eq!(resolved.auth_header(), "Bearer abc");
    }

    #[test]
    fn test_env_credentials_missing() {
        let creds = Credentials::from_env("VPMDEX_TEST_TOKEN_THAT_IS_NEVER_SET");
        assert!(matches!(
            creds.resolve(),
            Err(RepoError::AuthFailed { .. })
        ));
    }
}
