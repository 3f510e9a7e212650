use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::shared::ValidationError;

/// Which ordinals a replica-set scan visits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanBound {
    /// Ordinals `0..replicas`.
    #[default]
    Declared,
    /// Ordinals `0..=replicas`, one past the declared replica count.
    DeclaredPlusOne,
}

impl ScanBound {
    /// Returns the ordinals to visit for `replicas` declared replicas.
    pub fn ordinals(self, replicas: u32) -> std::ops::Range<u32> {
        match self {
            ScanBound::Declared => 0..replicas,
            ScanBound::DeclaredPlusOne => 0..replicas.saturating_add(1),
        }
    }
}

/// Settings for the primary probes run during topology resolution.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Upper bound, in milliseconds, for opening a probe tunnel and for the probe round trip.
    pub timeout_ms: u64,
    /// Ordinal range visited when scanning a replica set.
    pub scan_bound: ScanBound,
}

impl ProbeConfig {
    /// Returns the per-step timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_ms == 0 {
            return Err(ValidationError::ProbeTimeoutZero);
        }

        Ok(())
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            scan_bound: ScanBound::Declared,
        }
    }
}
