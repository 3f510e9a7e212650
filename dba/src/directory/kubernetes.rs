use async_trait::async_trait;
use dba_config::shared::ClusterConfig;
use k8s_openapi::api::core::v1::{Pod, Secret};
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use crate::directory::ClusterDirectory;
use crate::error::{DbaError, DbaResult, ErrorKind};
use crate::types::{
    CredentialSecret, DatabaseInstance, Engine, KUBEDB_GROUP, KUBEDB_VERSION, LabelSelector,
    PodCandidate,
};
use crate::dba_error;

/// Builds a [`kube::Client`] from the cluster access configuration.
///
/// Reads the kubeconfig resolved by [`ClusterConfig::resolved_kubeconfig_path`]
/// and falls back to the ambient configuration when no path can be resolved.
pub async fn connect_kube_client(config: &ClusterConfig) -> DbaResult<Client> {
    let kube_config = match config.resolved_kubeconfig_path() {
        Some(path) => {
            debug!(path = %path.display(), "reading kubeconfig");

            let kubeconfig = Kubeconfig::read_from(&path)?;
            let options = KubeConfigOptions {
                context: config.context.clone(),
                ..KubeConfigOptions::default()
            };
            Config::from_custom_kubeconfig(kubeconfig, &options).await?
        }
        None => Config::infer().await.map_err(|err| {
            dba_error!(
                ErrorKind::ConfigError,
                "Cluster configuration could not be inferred",
                err
            )
        })?,
    };

    Ok(Client::try_from(kube_config)?)
}

/// [`ClusterDirectory`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeDirectory {
    client: Client,
}

impl KubeDirectory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connects using `config` and wraps the resulting client.
    pub async fn connect(config: &ClusterConfig) -> DbaResult<Self> {
        Ok(Self::new(connect_kube_client(config).await?))
    }

    /// The underlying client, shared with the tunnel manager.
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn instance_api(&self, engine: Engine, namespace: &str) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(KUBEDB_GROUP, KUBEDB_VERSION, engine.kind());
        let resource = ApiResource::from_gvk_with_plural(&gvk, engine.plural());

        Api::namespaced_with(self.client.clone(), namespace, &resource)
    }
}

#[async_trait]
impl ClusterDirectory for KubeDirectory {
    async fn get_instance(
        &self,
        engine: Engine,
        namespace: &str,
        name: &str,
    ) -> DbaResult<DatabaseInstance> {
        debug!(%engine, namespace, name, "fetching database instance");

        let object = self.instance_api(engine, namespace).get(name).await?;

        DatabaseInstance::from_resource(
            engine,
            namespace,
            name,
            object.data.get("spec"),
            object.data.get("status"),
        )
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> DbaResult<CredentialSecret> {
        debug!(namespace, name, "fetching secret");

        let secret = Api::<Secret>::namespaced(self.client.clone(), namespace)
            .get(name)
            .await
            .map_err(|err| DbaError::from(err).with_context(format!("secret {namespace}/{name}")))?;

        Ok(CredentialSecret::from(secret))
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> DbaResult<Vec<PodCandidate>> {
        debug!(namespace, %selector, "listing pods");

        let mut params = ListParams::default();
        if !selector.is_empty() {
            params = params.labels(&selector.to_string());
        }

        let pods = Api::<Pod>::namespaced(self.client.clone(), namespace)
            .list(&params)
            .await
            .map_err(|err| {
                DbaError::from(err).with_context(format!("pods in {namespace} matching {selector}"))
            })?;

        Ok(pods.items.into_iter().map(PodCandidate::from).collect())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> DbaResult<PodCandidate> {
        debug!(namespace, name, "fetching pod");

        let pod = Api::<Pod>::namespaced(self.client.clone(), namespace)
            .get(name)
            .await
            .map_err(|err| DbaError::from(err).with_context(format!("pod {namespace}/{name}")))?;

        Ok(PodCandidate::from(pod))
    }
}
