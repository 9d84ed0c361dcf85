//! Layered settings for the Secret Manager property source.
//!
//! Sources, lowest precedence first: `config/default`, `config/{RUN_MODE}`,
//! `config/local`, then `APP_`-prefixed environment variables with `__` as the
//! nesting separator (e.g. `APP_SECRETMANAGER__PROJECT_ID`).

use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::env;
use std::time::Duration;
use url::Url;

const DEFAULT_ENDPOINT: &str = "https://secretmanager.googleapis.com";

#[derive(Debug, Deserialize)]
pub struct Log {
    pub level: String,
}

/// Pins one secret to a version label instead of `latest`.
///
/// The secret id is a value rather than a table key: the `config` crate
/// lowercases keys, and secret ids are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionOverride {
    pub secret_id: String,
    pub version: String,
}

/// Reads one secret from another project instead of `project_id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectOverride {
    pub secret_id: String,
    pub project_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecretManagerSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub secret_name_prefix: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Secrets without an entry read `latest`.
    #[serde(default)]
    pub versions: Vec<VersionOverride>,
    /// Secrets without an entry read from `project_id`.
    #[serde(default)]
    pub project_ids: Vec<ProjectOverride>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for SecretManagerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            project_id: String::new(),
            secret_name_prefix: String::new(),
            endpoint: default_endpoint(),
            access_token: None,
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
            versions: Vec::new(),
            project_ids: Vec::new(),
        }
    }
}

impl SecretManagerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn endpoint_url(&self) -> gcp_error::Result<Url> {
        Url::parse(&self.endpoint).map_err(|e| {
            gcp_error::Error::Config(format!("invalid endpoint '{}': {}", self.endpoint, e))
        })
    }

    /// Secret id -> version label.
    pub fn version_overrides(&self) -> HashMap<String, String> {
        self.versions
            .iter()
            .map(|o| (o.secret_id.clone(), o.version.clone()))
            .collect()
    }

    /// Secret id -> project id.
    pub fn project_overrides(&self) -> HashMap<String, String> {
        self.project_ids
            .iter()
            .map(|o| (o.secret_id.clone(), o.project_id.clone()))
            .collect()
    }

    /// Checks the settings needed to build a property source. Disabled settings always pass.
    pub fn validate(&self) -> gcp_error::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.project_id.trim().is_empty() {
            return Err(gcp_error::Error::Config(
                "secretmanager.project_id must be set when secretmanager.enabled is true".into(),
            ));
        }
        if self.page_size == 0 {
            return Err(gcp_error::Error::Config(
                "secretmanager.page_size must be greater than zero".into(),
            ));
        }
        self.endpoint_url()?;
        check_overrides(self.versions.iter().map(|o| (&o.secret_id, &o.version)))?;
        check_overrides(self.project_ids.iter().map(|o| (&o.secret_id, &o.project_id)))?;
        Ok(())
    }
}

/// Rejects blank ids or targets and ids listed twice in one table.
fn check_overrides<'a>(
    entries: impl Iterator<Item = (&'a String, &'a String)>,
) -> gcp_error::Result<()> {
    let mut seen = HashSet::new();
    for (secret_id, target) in entries {
        let invalid = |reason: &str| gcp_error::Error::InvalidOverride {
            secret_id: secret_id.clone(),
            reason: reason.to_string(),
        };
        if secret_id.trim().is_empty() {
            return Err(invalid("secret id is blank"));
        }
        if target.trim().is_empty() {
            return Err(invalid("override value is blank"));
        }
        if !seen.insert(secret_id.as_str()) {
            return Err(invalid("listed more than once"));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub log: Log,
    #[serde(default)]
    pub secretmanager: SecretManagerSettings,
}

impl Settings {
    /// Loads settings from the `config/` directory at the workspace root.
    pub fn new() -> gcp_error::Result<Self> {
        let cargo_manifest_dir = env::var("CARGO_MANIFEST_DIR")
            .map_err(|e| gcp_error::Error::Internal(e.to_string()))?;
        let mut path = Utf8PathBuf::from(cargo_manifest_dir);
        path.pop();
        path.pop();
        path.pop();

        Self::from_path(&path)
    }

    /// Loads settings from the `config/` directory under `root`.
    pub fn from_path(root: &Utf8Path) -> gcp_error::Result<Self> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        Self::load(root, &run_mode, environment())
    }

    pub fn load(
        root: &Utf8Path,
        run_mode: &str,
        environment: Environment,
    ) -> gcp_error::Result<Self> {
        let s = Config::builder()
            .add_source(File::with_name(root.join("config/default").as_str()))
            .add_source(
                File::with_name(root.join(format!("config/{}", run_mode)).as_str()).required(false),
            )
            .add_source(File::with_name(root.join("config/local").as_str()).required(false))
            .add_source(environment)
            .build()
            .map_err(|e| gcp_error::Error::Config(e.to_string()))?;

        let settings: Settings = s
            .try_deserialize()
            .map_err(|e| gcp_error::Error::Config(e.to_string()))?;
        settings.secretmanager.validate()?;
        Ok(settings)
    }
}

/// The environment source used by [`Settings::new`].
pub fn environment() -> Environment {
    Environment::with_prefix("app")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
