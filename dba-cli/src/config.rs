use dba_config::load_config;
use dba_config::shared::DbaConfig;

/// Loads the [`DbaConfig`] and validates it.
pub fn load_dba_config() -> anyhow::Result<DbaConfig> {
    let config = load_config::<DbaConfig>()?;
    config.validate()?;

    Ok(config)
}
