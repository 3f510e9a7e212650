use std::fmt;

use crate::types::Engine;

/// The pod a session should be opened against.
///
/// Produced once by the resolver and consumed by the session path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub engine: Engine,
    pub namespace: String,
    pub pod_name: String,
    pub secret_name: Option<String>,
    pub remote_port: u16,
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}:{}",
            self.namespace, self.pod_name, self.remote_port
        )
    }
}
