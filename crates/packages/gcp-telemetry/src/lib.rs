use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Builds the filter from `RUST_LOG`, falling back to `default_level`
/// (typically `log.level` from the settings).
pub fn env_filter(default_level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level)
            .map_err(|e| anyhow!("invalid log level '{}': {}", default_level, e)),
    }
}

/// Installs the global subscriber: env filter plus a formatted stdout layer.
///
/// Fails if a global subscriber is already set.
pub fn init_subscriber(service_name: &str, default_level: &str) -> Result<()> {
    let filter = env_filter(default_level)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()?;

    tracing::debug!(service = service_name, "telemetry initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_accepts_directives() {
        assert!(env_filter("info").is_ok());
        assert!(env_filter("gcp_config_loader=debug,warn").is_ok());
    }

    #[test]
    fn test_init_twice_fails() {
        // Other tests in this binary never install a subscriber.
        assert!(init_subscriber("gcp-telemetry-test", "info").is_ok());
        assert!(init_subscriber("gcp-telemetry-test", "info").is_err());
    }
}
