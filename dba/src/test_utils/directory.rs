use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::bail;
use crate::directory::ClusterDirectory;
use crate::error::{DbaResult, ErrorKind};
use crate::types::{CredentialSecret, DatabaseInstance, Engine, LabelSelector, PodCandidate};

/// A call received by [`MemoryDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    GetInstance {
        engine: Engine,
        namespace: String,
        name: String,
    },
    GetSecret {
        namespace: String,
        name: String,
    },
    ListPods {
        namespace: String,
        selector: String,
    },
    GetPod {
        namespace: String,
        name: String,
    },
}

#[derive(Debug, Default)]
struct Inner {
    instances: HashMap<(Engine, String, String), DatabaseInstance>,
    secrets: HashMap<(String, String), BTreeMap<String, Vec<u8>>>,
    pods: Vec<PodCandidate>,
    calls: Vec<DirectoryCall>,
}

/// [`ClusterDirectory`] backed by in-memory resources.
///
/// Pods are listed in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_instance(&self, instance: DatabaseInstance) {
        let mut inner = self.inner.lock().await;
        let key = (
            instance.engine,
            instance.namespace.clone(),
            instance.name.clone(),
        );
        inner.instances.insert(key, instance);
    }

    pub async fn add_secret(&self, namespace: &str, name: &str, entries: &[(&str, &str)]) {
        let mut inner = self.inner.lock().await;
        let data = entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.as_bytes().to_vec()))
            .collect();
        inner
            .secrets
            .insert((namespace.to_string(), name.to_string()), data);
    }

    pub async fn add_pod(&self, pod: PodCandidate) {
        let mut inner = self.inner.lock().await;
        inner.pods.push(pod);
    }

    pub async fn add_pods(&self, pods: impl IntoIterator<Item = PodCandidate>) {
        let mut inner = self.inner.lock().await;
        inner.pods.extend(pods);
    }

    /// Calls received so far, in order.
    pub async fn calls(&self) -> Vec<DirectoryCall> {
        let inner = self.inner.lock().await;
        inner.calls.clone()
    }
}

#[async_trait]
impl ClusterDirectory for MemoryDirectory {
    async fn get_instance(
        &self,
        engine: Engine,
        namespace: &str,
        name: &str,
    ) -> DbaResult<DatabaseInstance> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(DirectoryCall::GetInstance {
            engine,
            namespace: namespace.to_string(),
            name: name.to_string(),
        });

        let key = (engine, namespace.to_string(), name.to_string());
        match inner.instances.get(&key) {
            Some(instance) => Ok(instance.clone()),
            None => bail!(ErrorKind::NotFound, "Database instance not found"),
        }
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> DbaResult<CredentialSecret> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(DirectoryCall::GetSecret {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });

        let Some(data) = inner.secrets.get(&(namespace.to_string(), name.to_string())) else {
            bail!(
                ErrorKind::NotFound,
                "Secret not found",
                format!("{namespace}/{name}")
            );
        };

        let secret = data
            .iter()
            .fold(CredentialSecret::new(name), |secret, (key, value)| {
                secret.with_entry(key.clone(), value.clone())
            });

        Ok(secret)
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> DbaResult<Vec<PodCandidate>> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(DirectoryCall::ListPods {
            namespace: namespace.to_string(),
            selector: selector.to_string(),
        });

        let pods = inner
            .pods
            .iter()
            .filter(|pod| pod.namespace == namespace && selector.matches(&pod.labels))
            .cloned()
            .collect();

        Ok(pods)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> DbaResult<PodCandidate> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(DirectoryCall::GetPod {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });

        match inner
            .pods
            .iter()
            .find(|pod| pod.namespace == namespace && pod.name == name)
        {
            Some(pod) => Ok(pod.clone()),
            None => bail!(
                ErrorKind::NotFound,
                "Pod not found",
                format!("{namespace}/{name}")
            ),
        }
    }
}
