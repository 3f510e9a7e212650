//! Resolution of the pod a session should target.
//!
//! The resolver reads the instance, refuses anything that is not running and
//! then dispatches on the declared topology. Replica sets with a
//! protocol-level election are scanned one ordinal at a time: a probe tunnel
//! is opened, the engine's probe runs over it and the tunnel is closed before
//! the next ordinal is visited. Unreachable or failing members are skipped,
//! while directory errors abort the resolution.

use dba_config::shared::ProbeConfig;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::directory::ClusterDirectory;
use crate::error::{DbaError, DbaResult, ErrorKind};
use crate::probe::{PrimaryProbe, ProbeCandidate, ProbeSet};
use crate::tunnel::{Tunnel, TunnelManager};
use crate::types::{
    CLIENT_ROLE_VALUE, Credentials, DatabaseInstance, Engine, LABEL_CLIENT_ROLE, PRIMARY_ROLE,
    PodCandidate, ResolvedTarget, Topology,
};
use crate::{bail, dba_error};

/// Name segment identifying the router pods of a sharded instance.
const ROUTER_SUFFIX: &str = "mongos";

/// Resolves instances to the pod that accepts sessions.
#[derive(Debug)]
pub struct Resolver<D, T> {
    directory: D,
    tunnels: T,
    probes: ProbeSet,
    config: ProbeConfig,
}

impl<D, T> Resolver<D, T>
where
    D: ClusterDirectory,
    T: TunnelManager,
{
    pub fn new(directory: D, tunnels: T, probes: ProbeSet, config: ProbeConfig) -> Self {
        Self {
            directory,
            tunnels,
            probes,
            config,
        }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn tunnels(&self) -> &T {
        &self.tunnels
    }

    /// Resolves the primary pod of instance `name` in `namespace`.
    ///
    /// Fails with [`ErrorKind::NotReady`] before any further cluster call when
    /// the instance is not running.
    pub async fn resolve_primary(
        &self,
        engine: Engine,
        namespace: &str,
        name: &str,
    ) -> DbaResult<ResolvedTarget> {
        let instance = self
            .directory
            .get_instance(engine, namespace, name)
            .await
            .map_err(|err| err.with_context(format!("{engine} {namespace}/{name}")))?;

        if !instance.is_running() {
            bail!(
                ErrorKind::NotReady,
                "Database instance is not running",
                format!("{instance} is in phase {}", instance.phase)
            );
        }

        debug!(%instance, topology = ?instance.topology, "resolving primary");

        let pod_name = self
            .select_pod(&instance)
            .await
            .map_err(|err| err.with_context(&instance))?;

        let target = ResolvedTarget {
            engine,
            namespace: instance.namespace,
            pod_name,
            secret_name: instance.secret_name,
            remote_port: engine.service_port(),
        };

        info!(%target, "resolved session target");

        Ok(target)
    }

    /// Picks the session pod according to the declared topology.
    async fn select_pod(&self, instance: &DatabaseInstance) -> DbaResult<String> {
        match instance.topology {
            Topology::Standalone => Ok(instance.ordinal_pod_name(0)),
            Topology::ShardedCluster => self.resolve_router(instance).await,
            Topology::ClientRoleCluster {
                dedicated_client_nodes,
            } => {
                self.resolve_client_node(instance, dedicated_client_nodes)
                    .await
            }
            Topology::LabeledPrimaryCluster { replicas } => {
                self.resolve_labeled_primary(instance, replicas).await
            }
            Topology::ReplicaSet { replicas } => {
                self.resolve_elected_primary(instance, replicas).await
            }
        }
    }

    async fn resolve_router(&self, instance: &DatabaseInstance) -> DbaResult<String> {
        let prefix = format!("{}-{ROUTER_SUFFIX}", instance.name);
        let pods = self
            .directory
            .list_pods(&instance.namespace, &instance.pod_selector())
            .await?;

        let routers = pods.into_iter().filter(|pod| pod.name.starts_with(&prefix));
        match lowest_ordinal(routers) {
            Some(pod) => Ok(pod.name),
            None => bail!(
                ErrorKind::NoPrimaryFound,
                "No router pod found for sharded instance",
                format!("no pod named {prefix}*")
            ),
        }
    }

    async fn resolve_client_node(
        &self,
        instance: &DatabaseInstance,
        dedicated_client_nodes: bool,
    ) -> DbaResult<String> {
        let mut selector = instance.pod_selector();
        if dedicated_client_nodes {
            selector = selector.with(LABEL_CLIENT_ROLE, CLIENT_ROLE_VALUE);
        }

        let pods = self
            .directory
            .list_pods(&instance.namespace, &selector)
            .await?;

        match lowest_ordinal(pods) {
            Some(pod) => Ok(pod.name),
            None => bail!(
                ErrorKind::NoPrimaryFound,
                "No client pod found for instance",
                format!("no pod matching {selector}")
            ),
        }
    }

    async fn resolve_labeled_primary(
        &self,
        instance: &DatabaseInstance,
        replicas: u32,
    ) -> DbaResult<String> {
        for ordinal in 0..replicas {
            let pod_name = instance.ordinal_pod_name(ordinal);
            let pod = self
                .directory
                .get_pod(&instance.namespace, &pod_name)
                .await?;

            if pod.role() == Some(PRIMARY_ROLE) {
                return Ok(pod.name);
            }

            debug!(pod = %pod.name, role = ?pod.role(), "pod is not labeled primary");
        }

        bail!(
            ErrorKind::NoPrimaryFound,
            "No pod is labeled primary",
            format!("none of {replicas} replicas is labeled primary")
        )
    }

    async fn resolve_elected_primary(
        &self,
        instance: &DatabaseInstance,
        replicas: u32,
    ) -> DbaResult<String> {
        let Some(probe) = self.probes.get(instance.engine) else {
            bail!(
                ErrorKind::InvalidData,
                "No primary probe is registered for the engine",
                instance.engine
            );
        };
        let Some(secret_name) = instance.secret_name.as_deref() else {
            bail!(
                ErrorKind::InvalidData,
                "Replicated instance declares no credential secret"
            );
        };

        let secret = self
            .directory
            .get_secret(&instance.namespace, secret_name)
            .await?;
        let credentials = secret.credentials(instance.engine)?;

        let ordinals = self.config.scan_bound.ordinals(replicas);
        let scanned = ordinals.len();
        let mut skipped = Vec::new();
        for ordinal in ordinals {
            let pod_name = instance.ordinal_pod_name(ordinal);

            match self
                .probe_pod(probe.as_ref(), instance, &pod_name, &credentials)
                .await
            {
                Ok(true) => return Ok(pod_name),
                Ok(false) => debug!(pod = %pod_name, "pod is not primary"),
                Err(err) if is_member_failure(&err) => {
                    warn!(pod = %pod_name, error = %err, "primary probe failed, trying next pod");
                    skipped.push(err.with_context(&pod_name));
                }
                Err(err) => return Err(err.with_context(&pod_name)),
            }
        }

        if skipped.is_empty() {
            bail!(
                ErrorKind::NoPrimaryFound,
                "No replica affirmed the primary role",
                format!("none of {scanned} pods is primary")
            );
        }

        bail!(
            ErrorKind::NoPrimaryFound,
            "No replica affirmed the primary role",
            format!(
                "{} of {scanned} pods could not be probed: {}",
                skipped.len(),
                DbaError::many(skipped)
            )
        )
    }

    /// Opens a tunnel to `pod_name`, runs the probe and closes the tunnel.
    ///
    /// The tunnel is closed before returning on every path.
    async fn probe_pod(
        &self,
        probe: &dyn PrimaryProbe,
        instance: &DatabaseInstance,
        pod_name: &str,
        credentials: &Credentials,
    ) -> DbaResult<bool> {
        let step_timeout = self.config.timeout();

        let tunnel = match timeout(
            step_timeout,
            self.tunnels
                .open(&instance.namespace, pod_name, instance.engine.service_port()),
        )
        .await
        {
            Ok(tunnel) => tunnel?,
            Err(_) => bail!(ErrorKind::ProbeTimeout, "Opening the probe tunnel timed out"),
        };

        let candidate = ProbeCandidate {
            pod_name: pod_name.to_string(),
            local_port: tunnel.local_port(),
            credentials: credentials.clone(),
        };
        let result = timeout(step_timeout, probe.is_primary(&candidate)).await;

        tunnel.close().await;

        match result {
            Ok(result) => result,
            Err(_) => Err(dba_error!(ErrorKind::ProbeTimeout, "Primary probe timed out")),
        }
    }
}

/// Returns `true` for failures confined to a single replica.
fn is_member_failure(err: &DbaError) -> bool {
    matches!(
        err.kind(),
        ErrorKind::ConnectFailed | ErrorKind::ProbeFailed | ErrorKind::ProbeTimeout
    )
}

/// Picks the pod with the lowest ordinal, breaking ties by name.
///
/// Pods without an ordinal sort last.
fn lowest_ordinal(pods: impl IntoIterator<Item = PodCandidate>) -> Option<PodCandidate> {
    pods.into_iter().min_by(|a, b| {
        let a_key = (a.ordinal().unwrap_or(u32::MAX), &a.name);
        let b_key = (b.ordinal().unwrap_or(u32::MAX), &b.name);
        a_key.cmp(&b_key)
    })
}
