use dba::directory::{KubeDirectory, connect_kube_client};
use dba::invocation::{Invocation, execute};
use dba::probe::ProbeSet;
use dba::resolver::Resolver;
use dba::session::ProcessSessionRunner;
use dba::tunnel::KubeTunnelManager;
use dba_config::shared::{ClusterConfig, DbaConfig, ProbeConfig, SessionConfig};
use tracing::{debug, error, info};

/// Runs one invocation against the cluster described by `config`.
///
/// Failures are logged with the engine, instance and namespace before being
/// returned.
pub async fn run_with_config(config: DbaConfig, invocation: Invocation) -> anyhow::Result<()> {
    info!(%invocation, "starting invocation");

    log_config(&config);

    if let Err(err) = run(config, &invocation).await {
        error!(
            engine = %invocation.engine,
            instance = %invocation.name,
            namespace = %invocation.namespace,
            "invocation failed: {err}"
        );

        return Err(err.into());
    }

    info!(%invocation, "invocation completed");

    Ok(())
}

async fn run(config: DbaConfig, invocation: &Invocation) -> dba::error::DbaResult<()> {
    let client = connect_kube_client(&config.cluster).await?;

    let resolver = Resolver::new(
        KubeDirectory::new(client.clone()),
        KubeTunnelManager::new(client),
        ProbeSet::standard(&config.probe),
        config.probe,
    );
    let runner = ProcessSessionRunner::new(config.session);

    execute(&resolver, &runner, invocation).await
}

fn log_config(config: &DbaConfig) {
    log_cluster_config(&config.cluster);
    log_probe_config(&config.probe);
    log_session_config(&config.session);
}

fn log_cluster_config(config: &ClusterConfig) {
    debug!(
        kubeconfig_path = ?config.resolved_kubeconfig_path(),
        context = ?config.context,
        "cluster config"
    );
}

fn log_probe_config(config: &ProbeConfig) {
    debug!(
        timeout_ms = config.timeout_ms,
        scan_bound = ?config.scan_bound,
        "probe config"
    );
}

fn log_session_config(config: &SessionConfig) {
    debug!(
        runtime = ?config.runtime,
        container_binary = config.container_binary,
        "session config"
    );
}
