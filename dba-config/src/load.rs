use std::path::PathBuf;

use serde::de::DeserializeOwned;

use crate::environment::Environment;

/// Environment variable pointing at the directory holding configuration files.
const CONFIG_DIR_ENV_NAME: &str = "DBA_CONFIG_DIR";

/// Directory containing configuration files relative to the working directory.
const CONFIGURATION_DIR: &str = "configuration";

/// Base configuration file loaded for all environments.
const BASE_CONFIG_FILE: &str = "base.yaml";

/// Prefix for environment variable configuration overrides.
const ENV_PREFIX: &str = "DBA";

/// Separator between environment variable prefix and key segments.
const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested configuration keys in environment variables.
///
/// Example: `DBA_PROBE__TIMEOUT_MS` sets the `probe.timeout_ms` field.
const ENV_SEPARATOR: &str = "__";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum LoadConfigError {
    #[error("failed to determine the configuration environment: {0}")]
    Environment(#[from] std::io::Error),

    #[error("failed to build configuration: {0}")]
    Config(#[from] config::ConfigError),
}

/// Returns the directory configuration files are read from.
///
/// Uses `DBA_CONFIG_DIR` when set, otherwise `./configuration`.
pub fn configuration_directory() -> PathBuf {
    match std::env::var(CONFIG_DIR_ENV_NAME) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(CONFIGURATION_DIR),
    }
}

/// Loads hierarchical configuration from YAML files and environment variables.
///
/// Loads configuration in this order:
/// 1. Base configuration from `<config dir>/base.yaml`, if present
/// 2. Environment-specific file from `<config dir>/{environment}.yaml`, if present
/// 3. Environment variable overrides prefixed with `DBA`
///
/// Both files are optional so a tool invocation without any configuration on
/// disk falls back to the types' defaults.
pub fn load_config<T>() -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    let configuration_directory = configuration_directory();

    let environment = Environment::load()?;
    let environment_filename = format!("{environment}.yaml");

    let environment_source = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR);

    let settings = config::Config::builder()
        .add_source(
            config::File::from(configuration_directory.join(BASE_CONFIG_FILE)).required(false),
        )
        .add_source(
            config::File::from(configuration_directory.join(environment_filename))
                .required(false),
        )
        // E.g. `DBA_SESSION__RUNTIME=local` sets `session.runtime` to `local`.
        .add_source(environment_source)
        .build()?;

    Ok(settings.try_deserialize::<T>()?)
}
