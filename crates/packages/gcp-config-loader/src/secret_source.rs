use crate::PropertySource;
use bytes::Bytes;
use gcp_secrets::{LATEST_VERSION, SecretError, SecretManager, SecretVersionName};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// Default name reported by [`SecretPropertySource::name`].
pub const SOURCE_NAME: &str = "gcp-secret-manager";

/// Secret payloads keyed by `prefix + secret_id`, captured once at construction.
#[derive(Clone)]
pub struct SecretPropertySource {
    name: String,
    project_id: String,
    prefix: String,
    property_names: Vec<String>,
    properties: HashMap<String, Bytes>,
}

impl SecretPropertySource {
    /// Loads every secret of `project_id` at its `latest` version.
    pub async fn new<S>(client: &S, project_id: &str, prefix: &str) -> Result<Self, SecretError>
    where
        S: SecretManager + ?Sized,
    {
        Self::with_overrides(client, project_id, prefix, &HashMap::new(), &HashMap::new()).await
    }

    /// Loads every secret listed under `project_id`.
    ///
    /// `versions` pins a secret id to a version label and `project_ids` reads a
    /// secret id from another project. The first listing or access error is
    /// returned as-is and no source is built.
    pub async fn with_overrides<S>(
        client: &S,
        project_id: &str,
        prefix: &str,
        versions: &HashMap<String, String>,
        project_ids: &HashMap<String, String>,
    ) -> Result<Self, SecretError>
    where
        S: SecretManager + ?Sized,
    {
        let secrets = client.list_secrets(project_id).await?;

        let mut property_names = Vec::with_capacity(secrets.len());
        let mut properties = HashMap::with_capacity(secrets.len());

        for secret in &secrets {
            let secret_id = secret.secret_id();
            let version_name = resolve_version_name(project_id, secret_id, versions, project_ids);
            debug!(
                project = %version_name.project,
                secret = %version_name.secret,
                version = %version_name.version,
                "reading secret"
            );

            let payload = client.access_secret_version(&version_name).await?;

            let key = format!("{prefix}{secret_id}");
            if properties.insert(key.clone(), payload.data).is_none() {
                property_names.push(key);
            }
        }

        info!(project_id, prefix, count = property_names.len(), "loaded secrets");

        Ok(Self {
            name: SOURCE_NAME.to_string(),
            project_id: project_id.to_string(),
            prefix: prefix.to_string(),
            property_names,
            properties,
        })
    }

    /// Renames the source.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn len(&self) -> usize {
        self.property_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.property_names.is_empty()
    }

    /// The payload as UTF-8 text; `None` when absent or not valid UTF-8.
    pub fn get_property_str(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .and_then(|data| std::str::from_utf8(data).ok())
    }

    /// (name, payload) pairs in property-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bytes)> {
        self.property_names
            .iter()
            .filter_map(|name| self.properties.get(name).map(|data| (name.as_str(), data)))
    }
}

// Payloads never reach logs.
impl fmt::Debug for SecretPropertySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretPropertySource")
            .field("name", &self.name)
            .field("project_id", &self.project_id)
            .field("prefix", &self.prefix)
            .field("property_names", &self.property_names)
            .finish_non_exhaustive()
    }
}

impl PropertySource for SecretPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn property_names(&self) -> &[String] {
        &self.property_names
    }

    fn get_property(&self, name: &str) -> Option<&Bytes> {
        self.properties.get(name)
    }
}

/// Version from `versions`, else `latest`; project from `project_ids`, else the default.
fn resolve_version_name(
    default_project_id: &str,
    secret_id: &str,
    versions: &HashMap<String, String>,
    project_ids: &HashMap<String, String>,
) -> SecretVersionName {
    let version = versions
        .get(secret_id)
        .map(String::as_str)
        .unwrap_or(LATEST_VERSION);
    let project = project_ids
        .get(secret_id)
        .map(String::as_str)
        .unwrap_or(default_project_id);

    SecretVersionName::new(project, secret_id, version)
}
