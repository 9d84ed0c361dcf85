#![deny(clippy::all)]
#![forbid(unsafe_code)]

//! A client for listing and reading secrets stored in Google Cloud Secret Manager.
//!
//! The [`SecretManager`] trait is the capability the configuration loader consumes.
//! [`GcpSecretManager`] implements it against the Secret Manager v1 REST API, and
//! `InMemorySecretManager` (feature `mock`) implements it for tests.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

mod gcp;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use gcp::{DEFAULT_ENDPOINT, DEFAULT_PAGE_SIZE, GcpConfig, GcpSecretManager};
#[cfg(any(test, feature = "mock"))]
pub use mock::InMemorySecretManager;

/// Version alias that always points at the newest enabled version of a secret.
pub const LATEST_VERSION: &str = "latest";

/// Error types for secret management operations.
#[derive(thiserror::Error, Debug)]
pub enum SecretError {
    #[error("Secret Manager API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Secret not found: {name}")]
    NotFound { name: String },
    #[error("Permission denied on '{name}': {message}")]
    PermissionDenied { name: String, message: String },
    #[error("Authentication error: {0}")]
    Authentication(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("Payload decode error: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl SecretError {
    /// Returns `true` when the requested project, secret or version does not exist.
    ///
    /// Clean-up flows use this to skip secrets that are already gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SecretError::NotFound { .. })
    }
}

/// A secret as returned by the listing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    /// Fully qualified resource name, `projects/{project}/secrets/{secret_id}`.
    pub name: String,
}

impl Secret {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The secret id, i.e. the final non-empty `/`-separated segment of the
    /// resource name. Trailing slashes are ignored.
    pub fn secret_id(&self) -> &str {
        let trimmed = self.name.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }
}

/// One page of a secret listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretPage {
    pub secrets: Vec<Secret>,
    /// Token for the following page; `None` (or empty) on the last page.
    pub next_page_token: Option<String>,
}

/// Address of a single secret version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretVersionName {
    pub project: String,
    pub secret: String,
    pub version: String,
}

impl SecretVersionName {
    pub fn new(
        project: impl Into<String>,
        secret: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            secret: secret.into(),
            version: version.into(),
        }
    }

    pub fn latest(project: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::new(project, secret, LATEST_VERSION)
    }
}

impl fmt::Display for SecretVersionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projects/{}/secrets/{}/versions/{}",
            self.project, self.secret, self.version
        )
    }
}

/// Raw payload of a secret version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretPayload {
    pub data: Bytes,
}

impl SecretPayload {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

/// Trait for abstracting secret storage reads.
#[async_trait]
pub trait SecretManager: Send + Sync {
    /// Fetches one page of the secrets visible under `project_id`.
    ///
    /// # Arguments
    ///
    /// * `project_id` - The project whose secrets are listed.
    /// * `page_token` - Token returned by the previous page, `None` for the first page.
    async fn list_secrets_page(
        &self,
        project_id: &str,
        page_token: Option<&str>,
    ) -> Result<SecretPage, SecretError>;

    /// Reads the payload of a single secret version.
    ///
    /// Fails with [`SecretError::NotFound`] when the project, secret or version
    /// does not exist.
    async fn access_secret_version(
        &self,
        name: &SecretVersionName,
    ) -> Result<SecretPayload, SecretError>;

    /// Lists every secret under `project_id`, following page tokens until the
    /// listing is exhausted. An error on any page fails the whole listing, and so
    /// does a page token the server already handed out.
    async fn list_secrets(&self, project_id: &str) -> Result<Vec<Secret>, SecretError> {
        let mut secrets = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        loop {
            let page = self
                .list_secrets_page(project_id, page_token.as_deref())
                .await?;
            secrets.extend(page.secrets);

            match page.next_page_token {
                Some(token) if !token.is_empty() => {
                    if !seen_tokens.insert(token.clone()) {
                        return Err(SecretError::Api {
                            status: 500,
                            message: format!(
                                "listing of '{project_id}' returned page token '{token}' twice"
                            ),
                        });
                    }
                    page_token = Some(token);
                }
                _ => break,
            }
        }

        Ok(secrets)
    }
}
