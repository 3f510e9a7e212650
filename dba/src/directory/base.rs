use async_trait::async_trait;

use crate::error::DbaResult;
use crate::types::{CredentialSecret, DatabaseInstance, Engine, LabelSelector, PodCandidate};

/// Read operations over the orchestration API used during resolution.
///
/// Every call is single-shot with no client-side retry. Failures surface as
/// typed errors (`NotFound`, `Unauthorized`, `ClusterUnreachable`) rather
/// than empty results; only [`ClusterDirectory::list_pods`] may legitimately
/// return an empty list.
#[async_trait]
pub trait ClusterDirectory: Send + Sync {
    /// Fetches the custom resource of a database instance.
    async fn get_instance(
        &self,
        engine: Engine,
        namespace: &str,
        name: &str,
    ) -> DbaResult<DatabaseInstance>;

    /// Fetches a named secret.
    async fn get_secret(&self, namespace: &str, name: &str) -> DbaResult<CredentialSecret>;

    /// Lists the pods of a namespace matching `selector`.
    async fn list_pods(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> DbaResult<Vec<PodCandidate>>;

    /// Fetches a named pod.
    async fn get_pod(&self, namespace: &str, name: &str) -> DbaResult<PodCandidate>;
}
