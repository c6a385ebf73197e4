use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ConfigError;

/// Installs a console subscriber filtered by `RUST_LOG`, or by `default_filter`
/// when `RUST_LOG` is unset.
pub fn init_tracing(default_filter: &str) -> Result<(), ConfigError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|err| ConfigError::InvalidLogFilter(err.to_string()))?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|_| ConfigError::TracingAlreadyInitialized)?;

    tracing::debug!(default_filter, "tracing initialized");
    Ok(())
}
