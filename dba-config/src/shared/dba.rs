use serde::{Deserialize, Serialize};

use crate::shared::{ClusterConfig, ProbeConfig, SessionConfig, ValidationError};

/// Complete configuration for one tool invocation.
///
/// Every section has defaults, so an invocation without configuration files
/// or `DBA_` environment overrides is valid.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct DbaConfig {
    /// Cluster access settings.
    pub cluster: ClusterConfig,
    /// Primary probe settings.
    pub probe: ProbeConfig,
    /// External client settings.
    pub session: SessionConfig,
}

impl DbaConfig {
    /// Validates every section of the configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.probe.validate()?;
        self.session.validate()
    }
}
