use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dba_config::shared::ProbeConfig;

use crate::error::DbaResult;
use crate::probe::{GroupReplicationProbe, MongoPrimaryProbe};
use crate::types::{Credentials, Engine};

/// A pod reachable on a local port, to be asked whether it is primary.
#[derive(Debug, Clone)]
pub struct ProbeCandidate {
    pub pod_name: String,
    pub local_port: u16,
    pub credentials: Credentials,
}

/// Asks a single pod whether it currently holds the primary role.
#[async_trait]
pub trait PrimaryProbe: Send + Sync {
    /// Returns `Ok(false)` for a pod that answered but is not primary.
    async fn is_primary(&self, candidate: &ProbeCandidate) -> DbaResult<bool>;
}

/// Primary probes keyed by engine.
#[derive(Clone, Default)]
pub struct ProbeSet {
    probes: HashMap<Engine, Arc<dyn PrimaryProbe>>,
}

impl ProbeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probes for every engine with a protocol-level election.
    pub fn standard(config: &ProbeConfig) -> Self {
        Self::new()
            .with_probe(Engine::MongoDb, MongoPrimaryProbe::new(config.timeout()))
            .with_probe(Engine::MySql, GroupReplicationProbe::new(config.timeout()))
    }

    pub fn with_probe<P>(mut self, engine: Engine, probe: P) -> Self
    where
        P: PrimaryProbe + 'static,
    {
        self.probes.insert(engine, Arc::new(probe));
        self
    }

    pub fn get(&self, engine: Engine) -> Option<&Arc<dyn PrimaryProbe>> {
        self.probes.get(&engine)
    }
}

impl fmt::Debug for ProbeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.probes.keys()).finish()
    }
}
