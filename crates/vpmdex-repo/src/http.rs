//! HTTP client shared by the release provider, metadata and checksum fetches
//!
//! Redirects are followed by hand so that credentials are only attached to
//! requests on the origin they were scoped to.

use std::time::Duration;

use url::Url;

use crate::credentials::ScopedCredentials;
use crate::error::{RepoError, Result};

const USER_AGENT: &str = concat!("vpmdex/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: u32 = 10;

/// Secure HTTP client wrapper with redirect protection
#[derive(Debug, Clone)]
pub struct SecureHttpClient {
    client: reqwest::Client,
    credentials: ScopedCredentials,
}

impl SecureHttpClient {
    /// Create a new secure HTTP client
    pub fn new(credentials: ScopedCredentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            // Redirects are handled manually to keep tokens on their origin
            .redirect(reqwest::redirect::Policy::none())
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RepoError::NetworkError {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            credentials,
        })
    }

    /// Create without credentials
    pub fn public() -> Result<Self> {
        Self::new(ScopedCredentials::default())
    }

    /// Fetch a URL with secure redirect handling
    pub async fn get(&self, url: &str) -> Result<reqwest::Response> {
        self.get_with_accept(url, None).await
    }

    /// Fetch a URL with an explicit `Accept` header
    pub async fn get_with_accept(
        &self,
        url: &str,
        accept: Option<&str>,
    ) -> Result<reqwest::Response> {
        let original_url = url.to_string();
        let mut current_url = url.to_string();
        let mut redirects = 0;

        loop {
            let mut request = self.client.get(&current_url);
            if let Some(accept) = accept {
                request = request.header(reqwest::header::ACCEPT, accept);
            }

            if ScopedCredentials::same_origin(&original_url, &current_url) {
                if let Some(creds) = self.credentials.for_url(&current_url) {
                    request = request.header(reqwest::header::AUTHORIZATION, creds.auth_header());
                }
            } else if !self.credentials.is_empty() {
                tracing::debug!(
                    "Cross-origin redirect from {} to {} - credentials not forwarded",
                    original_url,
                    current_url
                );
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_redirection() {
                redirects += 1;
                if redirects > MAX_REDIRECTS {
                    return Err(RepoError::NetworkError {
                        message: format!("Too many redirects (max {})", MAX_REDIRECTS),
                    });
                }

                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| RepoError::NetworkError {
                        message: "Redirect without Location header".to_string(),
                    })?;

                let base = Url::parse(&current_url)?;
                current_url = base.join(location)?.to_string();
                continue;
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);

                return Err(RepoError::RateLimited { retry_after });
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(RepoError::AuthRequired { url: current_url });
            }
            if status == reqwest::StatusCode::FORBIDDEN {
                return Err(RepoError::AuthFailed {
                    message: format!("Access denied to {}", current_url),
                });
            }

            if !status.is_success() {
                return Err(RepoError::HttpError {
                    status: status.as_u16(),
                    message: format!("Request to {} failed", current_url),
                });
            }

            return Ok(response);
        }
    }

    /// Fetch bytes from URL
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        let bytes = response.bytes().await.map_err(|e| RepoError::NetworkError {
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    /// Fetch text from URL
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        response.text().await.map_err(|e| RepoError::NetworkError {
            message: e.to_string(),
        })
    }
}
