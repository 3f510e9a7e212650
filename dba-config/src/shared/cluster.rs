use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable consulted for the kubeconfig path when none is configured.
pub const KUBECONFIG_PATH_ENV_NAME: &str = "KUBEDB_KUBE_CONFIG_PATH";

/// Kubeconfig location relative to the user's home directory used as the last fallback.
const DEFAULT_KUBECONFIG_RELATIVE_PATH: [&str; 2] = [".kube", "kind-config-kind"];

/// Cluster access configuration handed to the cluster directory client.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Explicit kubeconfig path. Takes precedence over the environment.
    pub kubeconfig_path: Option<PathBuf>,
    /// Kubeconfig context to use instead of the file's current context.
    pub context: Option<String>,
}

impl ClusterConfig {
    /// Resolves the kubeconfig file to read.
    ///
    /// Order: the configured path, then `KUBEDB_KUBE_CONFIG_PATH`, then
    /// `~/.kube/kind-config-kind`. Returns `None` only when no home directory
    /// can be determined for the last fallback.
    pub fn resolved_kubeconfig_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.kubeconfig_path {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(KUBECONFIG_PATH_ENV_NAME)
            && !path.is_empty()
        {
            return Some(PathBuf::from(path));
        }

        dirs::home_dir().map(|home| {
            DEFAULT_KUBECONFIG_RELATIVE_PATH
                .iter()
                .fold(home, |path, segment| path.join(segment))
        })
    }
}
