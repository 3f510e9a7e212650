use serde::Deserialize;
use std::fmt;

use crate::bail;
use crate::error::{DbaResult, ErrorKind};
use crate::types::{Engine, LabelSelector, LABEL_DATABASE_KIND, LABEL_DATABASE_NAME};

/// Lifecycle phase reported in an instance's status.
///
/// Unrecognized values map to [`Phase::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Provisioning,
    Initializing,
    Running,
    Paused,
    Failed,
    Unknown,
}

impl From<&str> for Phase {
    fn from(value: &str) -> Self {
        match value {
            "Provisioning" | "Creating" => Phase::Provisioning,
            "Initializing" => Phase::Initializing,
            "Running" => Phase::Running,
            "Paused" | "Dormant" => Phase::Paused,
            "Failed" => Phase::Failed,
            _ => Phase::Unknown,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Replication and sharding shape of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// A single pod with ordinal 0 and no election.
    Standalone,
    /// Replicas that elect a primary, discovered by probing each pod.
    ReplicaSet { replicas: u32 },
    /// A sharded deployment reached through router pods.
    ShardedCluster,
    /// A cluster where any pod, or any dedicated client node, accepts sessions.
    ClientRoleCluster { dedicated_client_nodes: bool },
    /// Replicas whose primary carries a role label maintained by a sidecar.
    LabeledPrimaryCluster { replicas: u32 },
}

/// A managed database deployment, read from its custom resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInstance {
    pub engine: Engine,
    pub name: String,
    pub namespace: String,
    pub topology: Topology,
    pub phase: Phase,
    /// Name of the credential secret, when the engine has one.
    pub secret_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct InstanceSpec {
    replicas: Option<u32>,
    database_secret: Option<SecretReference>,
    topology: Option<serde_json::Value>,
    replica_set: Option<serde_json::Value>,
    shard_topology: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SecretReference {
    secret_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InstanceStatus {
    phase: Option<String>,
}

impl DatabaseInstance {
    /// Builds an instance from the `spec` and `status` of its custom resource.
    ///
    /// Missing `spec` or `status` objects are treated as empty.
    pub fn from_resource(
        engine: Engine,
        namespace: &str,
        name: &str,
        spec: Option<&serde_json::Value>,
        status: Option<&serde_json::Value>,
    ) -> DbaResult<Self> {
        let spec: InstanceSpec = match spec {
            Some(value) => serde_json::from_value(value.clone())?,
            None => InstanceSpec::default(),
        };
        let status: InstanceStatus = match status {
            Some(value) => serde_json::from_value(value.clone())?,
            None => InstanceStatus::default(),
        };

        let topology = derive_topology(engine, namespace, name, &spec)?;
        let phase = status
            .phase
            .as_deref()
            .map(Phase::from)
            .unwrap_or(Phase::Unknown);

        let secret_name = match engine {
            Engine::Postgres | Engine::MySql | Engine::MongoDb => spec
                .database_secret
                .and_then(|secret| secret.secret_name)
                .filter(|secret_name| !secret_name.is_empty()),
            Engine::Elasticsearch => Some(format!("{name}-auth")),
            Engine::Redis | Engine::Memcached => None,
        };

        Ok(DatabaseInstance {
            engine,
            name: name.to_string(),
            namespace: namespace.to_string(),
            topology,
            phase,
            secret_name,
        })
    }

    /// Name of the pod with the given ordinal.
    pub fn ordinal_pod_name(&self, ordinal: u32) -> String {
        format!("{}-{ordinal}", self.name)
    }

    /// Selects every pod belonging to this instance.
    pub fn pod_selector(&self) -> LabelSelector {
        LabelSelector::new()
            .with(LABEL_DATABASE_KIND, self.engine.kind())
            .with(LABEL_DATABASE_NAME, self.name.as_str())
    }

    /// Returns `true` if sessions may be opened against this instance.
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }
}

impl fmt::Display for DatabaseInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.engine, self.namespace, self.name)
    }
}

fn derive_topology(
    engine: Engine,
    namespace: &str,
    name: &str,
    spec: &InstanceSpec,
) -> DbaResult<Topology> {
    let replicas = || -> DbaResult<u32> {
        match spec.replicas {
            Some(replicas) => Ok(replicas),
            None => bail!(
                ErrorKind::InvalidData,
                "Replicated instance declares no replica count",
                format!("{engine} {namespace}/{name}")
            ),
        }
    };

    let topology = match engine {
        Engine::Postgres => match spec.replicas {
            None | Some(0) | Some(1) => Topology::Standalone,
            Some(replicas) => Topology::LabeledPrimaryCluster { replicas },
        },
        Engine::MySql => {
            if spec.topology.is_some() {
                Topology::ReplicaSet {
                    replicas: replicas()?,
                }
            } else {
                Topology::Standalone
            }
        }
        Engine::MongoDb => {
            if spec.shard_topology.is_some() {
                Topology::ShardedCluster
            } else if spec.replica_set.is_some() {
                Topology::ReplicaSet {
                    replicas: replicas()?,
                }
            } else {
                Topology::Standalone
            }
        }
        Engine::Elasticsearch => Topology::ClientRoleCluster {
            dedicated_client_nodes: spec.topology.is_some(),
        },
        Engine::Redis | Engine::Memcached => Topology::ClientRoleCluster {
            dedicated_client_nodes: false,
        },
    };

    Ok(topology)
}
