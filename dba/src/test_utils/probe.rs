use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::dba_error;
use crate::error::{DbaResult, ErrorKind};
use crate::probe::{PrimaryProbe, ProbeCandidate};

/// Scripted answer of [`FakeProbe`] for one pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Primary,
    Secondary,
    Fail(ErrorKind),
    Hang,
}

#[derive(Debug, Default)]
struct Inner {
    outcomes: HashMap<String, ProbeOutcome>,
    probed: Vec<(String, u16)>,
}

/// [`PrimaryProbe`] answering from a per-pod script.
///
/// Pods without a scripted outcome answer [`ProbeOutcome::Secondary`].
#[derive(Debug, Clone, Default)]
pub struct FakeProbe {
    inner: Arc<Mutex<Inner>>,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn script(&self, pod_name: &str, outcome: ProbeOutcome) {
        let mut inner = self.inner.lock().await;
        inner.outcomes.insert(pod_name.to_string(), outcome);
    }

    /// Pods probed so far with the local port they were reached on.
    pub async fn probed(&self) -> Vec<(String, u16)> {
        let inner = self.inner.lock().await;
        inner.probed.clone()
    }
}

#[async_trait]
impl PrimaryProbe for FakeProbe {
    async fn is_primary(&self, candidate: &ProbeCandidate) -> DbaResult<bool> {
        let outcome = {
            let mut inner = self.inner.lock().await;
            inner
                .probed
                .push((candidate.pod_name.clone(), candidate.local_port));
            inner
                .outcomes
                .get(&candidate.pod_name)
                .copied()
                .unwrap_or(ProbeOutcome::Secondary)
        };

        match outcome {
            ProbeOutcome::Primary => Ok(true),
            ProbeOutcome::Secondary => Ok(false),
            ProbeOutcome::Fail(kind) => Err(dba_error!(kind, "Fake probe failure")),
            ProbeOutcome::Hang => std::future::pending().await,
        }
    }
}
