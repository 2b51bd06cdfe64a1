//! Command implementations.

mod query;
mod run;
mod validate;

pub use query::run_query;
pub use run::run_selector;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::SelectorConfig;
use tracing::info;

use crate::cli::ConnectionArgs;
use crate::error::CliError;

/// Load the config file (or defaults) and apply URL overrides
pub(crate) fn load_config(
    path: Option<&Path>,
    connection: &ConnectionArgs,
) -> Result<SelectorConfig> {
    let mut config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()).into());
            }
            info!(config = %path.display(), "Loading configuration");
            ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            info!("No configuration file given, using defaults");
            ConfigLoader::load_default().context("Default configuration is invalid")?
        }
    };

    apply_overrides(&mut config, connection);
    ConfigLoader::validate(&config).context("Configuration invalid after overrides")?;
    Ok(config)
}

fn apply_overrides(config: &mut SelectorConfig, connection: &ConnectionArgs) {
    if let Some(url) = &connection.bus_url {
        info!("Overriding bus URL from CLI/environment");
        config.bus.url = url.clone();
    }
    if let Some(url) = &connection.catalog_url {
        info!("Overriding catalog URL from CLI/environment");
        config.catalog.url = url.clone();
    }
}
