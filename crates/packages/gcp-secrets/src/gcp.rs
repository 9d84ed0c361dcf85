//! Google Cloud Secret Manager v1 REST implementation of `SecretManager`.

use crate::{Secret, SecretError, SecretManager, SecretPage, SecretPayload, SecretVersionName};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Public Secret Manager endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://secretmanager.googleapis.com";

/// Page size requested from the listing call.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the Secret Manager client.
#[derive(Clone)]
pub struct GcpConfig {
    pub endpoint: Url,
    pub access_token: Option<String>, // OAuth2 bearer token; omitted when a proxy handles auth
    pub page_size: u32,
    pub timeout: Duration,
}

impl GcpConfig {
    /// `endpoint` may carry a path prefix (e.g. a proxy mounted at `/sm`); request
    /// paths are appended below it.
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint: with_trailing_slash(endpoint),
            access_token: None,
            page_size: DEFAULT_PAGE_SIZE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for GcpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcpConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("page_size", &self.page_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Secret Manager client speaking the v1 REST API.
#[derive(Debug, Clone)]
pub struct GcpSecretManager {
    client: reqwest::Client,
    config: GcpConfig,
}

impl GcpSecretManager {
    pub fn new(mut config: GcpConfig) -> Result<Self, SecretError> {
        config.endpoint = with_trailing_slash(config.endpoint);
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GcpConfig {
        &self.config
    }

    /// Creates a secret with automatic replication.
    ///
    /// Returns `false` when the secret already exists.
    pub async fn create_secret(&self, project_id: &str, secret_id: &str) -> Result<bool, SecretError> {
        let mut url = self.build_url(&format!("v1/projects/{project_id}/secrets"))?;
        url.query_pairs_mut().append_pair("secretId", secret_id);

        let body = json!({
            "replication": { "automatic": {} },
        });
        let response = self.request(Method::POST, url).json(&body).send().await?;

        if response.status() == StatusCode::CONFLICT {
            debug!(project_id, secret_id, "secret already exists");
            return Ok(false);
        }
        check_status(response, &format!("projects/{project_id}/secrets/{secret_id}")).await?;
        Ok(true)
    }

    /// Adds a new version holding `data` and returns its resource name.
    pub async fn add_secret_version(
        &self,
        project_id: &str,
        secret_id: &str,
        data: &[u8],
    ) -> Result<String, SecretError> {
        let resource = format!("projects/{project_id}/secrets/{secret_id}");
        let url = self.build_url(&format!("v1/{resource}:addVersion"))?;

        let body = json!({
            "payload": { "data": STANDARD.encode(data) },
        });
        let response = self.request(Method::POST, url).json(&body).send().await?;
        let response = check_status(response, &resource).await?;

        #[derive(Deserialize)]
        struct SecretVersionResponse {
            name: String,
        }

        let created: SecretVersionResponse = serde_json::from_str(&response.text().await?)?;
        debug!(version = %created.name, "added secret version");
        Ok(created.name)
    }

    /// Deletes a secret and all of its versions.
    pub async fn delete_secret(&self, project_id: &str, secret_id: &str) -> Result<(), SecretError> {
        let resource = format!("projects/{project_id}/secrets/{secret_id}");
        let url = self.build_url(&format!("v1/{resource}"))?;

        let response = self.request(Method::DELETE, url).send().await?;
        check_status(response, &resource).await?;
        Ok(())
    }

    /// Deletes a secret, treating an already missing secret as success.
    ///
    /// Returns `true` when a secret was actually deleted.
    pub async fn delete_secret_if_exists(
        &self,
        project_id: &str,
        secret_id: &str,
    ) -> Result<bool, SecretError> {
        match self.delete_secret(project_id, secret_id).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn build_url(&self, path: &str) -> Result<Url, SecretError> {
        self.config.endpoint.join(path).map_err(SecretError::UrlParse)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl SecretManager for GcpSecretManager {
    async fn list_secrets_page(
        &self,
        project_id: &str,
        page_token: Option<&str>,
    ) -> Result<SecretPage, SecretError> {
        let mut url = self.build_url(&format!("v1/projects/{project_id}/secrets"))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pageSize", &self.config.page_size.to_string());
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }

        debug!(project_id, page_token, "listing secrets");
        let response = self.request(Method::GET, url).send().await?;
        let response = check_status(response, &format!("projects/{project_id}")).await?;

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ListSecretsResponse {
            #[serde(default)]
            secrets: Vec<Secret>,
            #[serde(default)]
            next_page_token: Option<String>,
        }

        let listed: ListSecretsResponse = serde_json::from_str(&response.text().await?)?;
        Ok(SecretPage {
            secrets: listed.secrets,
            next_page_token: listed.next_page_token,
        })
    }

    async fn access_secret_version(
        &self,
        name: &SecretVersionName,
    ) -> Result<SecretPayload, SecretError> {
        let resource = name.to_string();
        let url = self.build_url(&format!("v1/{resource}:access"))?;

        let response = self.request(Method::GET, url).send().await?;
        let response = check_status(response, &resource).await?;

        #[derive(Deserialize)]
        struct PayloadBody {
            #[serde(default)]
            data: Option<String>,
        }

        #[derive(Deserialize)]
        struct AccessSecretVersionResponse {
            #[serde(default)]
            payload: Option<PayloadBody>,
        }

        let accessed: AccessSecretVersionResponse = serde_json::from_str(&response.text().await?)?;
        let data = match accessed.payload.and_then(|p| p.data) {
            Some(encoded) => STANDARD.decode(encoded)?,
            None => Vec::new(),
        };

        Ok(SecretPayload::new(data))
    }
}

/// `Url::join` replaces the last path segment unless the base ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Maps a non-success response onto the matching `SecretError`.
async fn check_status(response: Response, resource: &str) -> Result<Response, SecretError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);
    warn!(resource, status = status.as_u16(), %message, "Secret Manager request failed");

    Err(match status {
        StatusCode::NOT_FOUND => SecretError::NotFound {
            name: resource.to_string(),
        },
        StatusCode::UNAUTHORIZED => SecretError::Authentication(message),
        StatusCode::FORBIDDEN => SecretError::PermissionDenied {
            name: resource.to_string(),
            message,
        },
        _ => SecretError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

/// Pulls `error.message` out of a Google API error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: ErrorBody,
    }

    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string())
}
