//! In-memory `SecretManager` for tests and local development.

use crate::{
    LATEST_VERSION, Secret, SecretError, SecretManager, SecretPage, SecretPayload,
    SecretVersionName,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

/// A deterministic secret store.
///
/// Versions are numbered from 1 in the order they are added; `latest` resolves to
/// the highest number. Every access call is recorded so tests can assert which
/// (project, secret, version) triples were requested.
#[derive(Debug)]
pub struct InMemorySecretManager {
    page_size: usize,
    listings: HashMap<String, Vec<Secret>>,
    versions: HashMap<(String, String), Vec<Bytes>>,
    denied: HashSet<(String, String)>,
    fail_listing_from_page: Option<usize>,
    access_log: Mutex<Vec<SecretVersionName>>,
}

impl Default for InMemorySecretManager {
    fn default() -> Self {
        Self {
            page_size: crate::DEFAULT_PAGE_SIZE as usize,
            listings: HashMap::new(),
            versions: HashMap::new(),
            denied: HashSet::new(),
            fail_listing_from_page: None,
            access_log: Mutex::new(Vec::new()),
        }
    }
}

impl InMemorySecretManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Adds a version to `secret_id` under `project`, creating and listing the
    /// secret on first use.
    pub fn with_secret_version(
        mut self,
        project: &str,
        secret_id: &str,
        data: impl Into<Bytes>,
    ) -> Self {
        let key = (project.to_string(), secret_id.to_string());
        if !self.versions.contains_key(&key) {
            self.listings
                .entry(project.to_string())
                .or_default()
                .push(Secret::new(format!("projects/{project}/secrets/{secret_id}")));
        }
        self.versions.entry(key).or_default().push(data.into());
        self
    }

    /// Appends a raw entry to the listing of `project` without creating versions.
    pub fn with_listing_entry(mut self, project: &str, name: &str) -> Self {
        self.listings
            .entry(project.to_string())
            .or_default()
            .push(Secret::new(name));
        self
    }

    /// Makes every access to `secret_id` under `project` fail with permission denied.
    pub fn deny_access(mut self, project: &str, secret_id: &str) -> Self {
        self.denied
            .insert((project.to_string(), secret_id.to_string()));
        self
    }

    /// Makes listing fail with a 503 when page `page` (zero-based) or later is requested.
    pub fn fail_listing_from_page(mut self, page: usize) -> Self {
        self.fail_listing_from_page = Some(page);
        self
    }

    /// Every access call made so far, in call order.
    pub async fn access_log(&self) -> Vec<SecretVersionName> {
        self.access_log.lock().await.clone()
    }

    fn resolve_version(&self, name: &SecretVersionName) -> Option<Bytes> {
        let versions = self
            .versions
            .get(&(name.project.clone(), name.secret.clone()))?;

        if name.version == LATEST_VERSION {
            return versions.last().cloned();
        }

        let number: usize = name.version.parse().ok()?;
        number
            .checked_sub(1)
            .and_then(|index| versions.get(index))
            .cloned()
    }
}

#[async_trait]
impl SecretManager for InMemorySecretManager {
    async fn list_secrets_page(
        &self,
        project_id: &str,
        page_token: Option<&str>,
    ) -> Result<SecretPage, SecretError> {
        let start = match page_token {
            Some(token) => token.parse::<usize>().map_err(|_| SecretError::Api {
                status: 400,
                message: format!("invalid page token '{token}'"),
            })?,
            None => 0,
        };

        if self
            .fail_listing_from_page
            .is_some_and(|failing| start / self.page_size >= failing)
        {
            return Err(SecretError::Api {
                status: 503,
                message: "listing interrupted".to_string(),
            });
        }

        let listing = self
            .listings
            .get(project_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let end = (start + self.page_size).min(listing.len());
        let secrets = listing.get(start..end).unwrap_or_default().to_vec();
        let next_page_token = (end < listing.len()).then(|| end.to_string());

        Ok(SecretPage {
            secrets,
            next_page_token,
        })
    }

    async fn access_secret_version(
        &self,
        name: &SecretVersionName,
    ) -> Result<SecretPayload, SecretError> {
        self.access_log.lock().await.push(name.clone());

        if self
            .denied
            .contains(&(name.project.clone(), name.secret.clone()))
        {
            return Err(SecretError::PermissionDenied {
                name: name.to_string(),
                message: "caller lacks secretmanager.versions.access".to_string(),
            });
        }

        self.resolve_version(name)
            .map(SecretPayload::new)
            .ok_or_else(|| SecretError::NotFound {
                name: name.to_string(),
            })
    }
}
