use crate::SecretPropertySource;
use anyhow::Result;
use gcp_config::SecretManagerSettings;
use gcp_secrets::{GcpConfig, GcpSecretManager, SecretManager};
use tracing::debug;

/// Builds a [`SecretPropertySource`] from settings using the given secret manager.
pub struct SecretPropertySourceLoader<S: SecretManager> {
    secret_manager: S,
}

impl<S: SecretManager> SecretPropertySourceLoader<S> {
    /// Creates a new `SecretPropertySourceLoader` with the given secret manager.
    pub fn new(secret_manager: S) -> Self {
        Self { secret_manager }
    }

    pub fn secret_manager(&self) -> &S {
        &self.secret_manager
    }

    /// Loads the property source described by `settings`.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the feature is disabled, the fully populated source otherwise.
    /// Invalid settings and any Secret Manager failure are returned as errors; a
    /// [`gcp_secrets::SecretError`] can be recovered with `downcast_ref`.
    pub async fn load(&self, settings: &SecretManagerSettings) -> Result<Option<SecretPropertySource>> {
        if !settings.enabled {
            debug!("secret manager property source disabled");
            return Ok(None);
        }
        settings.validate()?;

        let source = SecretPropertySource::with_overrides(
            &self.secret_manager,
            &settings.project_id,
            &settings.secret_name_prefix,
            &settings.version_overrides(),
            &settings.project_overrides(),
        )
        .await?;

        Ok(Some(source))
    }
}

impl SecretPropertySourceLoader<GcpSecretManager> {
    /// Creates a loader backed by the REST client described by `settings`.
    pub fn from_settings(settings: &SecretManagerSettings) -> Result<Self> {
        Ok(Self::new(gcp_client(settings)?))
    }
}

/// Builds the Secret Manager REST client from settings.
pub fn gcp_client(settings: &SecretManagerSettings) -> Result<GcpSecretManager> {
    let mut config = GcpConfig::new(settings.endpoint_url()?)
        .with_page_size(settings.page_size)
        .with_timeout(settings.timeout());
    if let Some(token) = &settings.access_token {
        config = config.with_access_token(token.clone());
    }

    Ok(GcpSecretManager::new(config)?)
}
