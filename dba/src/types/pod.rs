use k8s_openapi::api::core::v1::Pod;
use std::collections::BTreeMap;
use std::fmt;

use crate::types::LABEL_ROLE;

/// A pod that may be targeted for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodCandidate {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
}

impl PodCandidate {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Value of the role label, if the pod carries one.
    pub fn role(&self) -> Option<&str> {
        self.labels.get(LABEL_ROLE).map(String::as_str)
    }

    /// Ordinal parsed from the trailing `-<i>` of the pod name.
    pub fn ordinal(&self) -> Option<u32> {
        let (_, suffix) = self.name.rsplit_once('-')?;
        suffix.parse().ok()
    }
}

impl From<Pod> for PodCandidate {
    fn from(pod: Pod) -> Self {
        PodCandidate {
            name: pod.metadata.name.unwrap_or_default(),
            namespace: pod.metadata.namespace.unwrap_or_default(),
            labels: pod.metadata.labels.unwrap_or_default(),
        }
    }
}

/// An equality-based label selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector(BTreeMap<String, String>);

impl LabelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns `true` if every requirement is satisfied by `labels`.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.0
            .iter()
            .all(|(key, value)| labels.get(key).is_some_and(|v| v == value))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}
