use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::bail;
use crate::error::{DbaResult, ErrorKind};
use crate::tunnel::{Tunnel, TunnelManager};

/// First local port handed out by [`FakeTunnelManager`].
const FIRST_LOCAL_PORT: u16 = 40_000;

/// A tunnel lifecycle event recorded by [`FakeTunnelManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelEvent {
    Opened {
        pod_name: String,
        remote_port: u16,
        local_port: u16,
    },
    Closed {
        pod_name: String,
        local_port: u16,
    },
}

#[derive(Debug)]
struct Inner {
    events: Vec<TunnelEvent>,
    failing: HashMap<String, ErrorKind>,
    hanging: HashSet<String>,
    free_ports: BTreeSet<u16>,
    next_port: u16,
    open: usize,
    max_open: usize,
}

/// [`TunnelManager`] that allocates fake local ports and records every event.
///
/// Closed ports return to the pool and are handed out again, lowest first.
#[derive(Debug, Clone)]
pub struct FakeTunnelManager {
    inner: Arc<Mutex<Inner>>,
}

impl FakeTunnelManager {
    pub fn new() -> Self {
        let inner = Inner {
            events: Vec::new(),
            failing: HashMap::new(),
            hanging: HashSet::new(),
            free_ports: BTreeSet::new(),
            next_port: FIRST_LOCAL_PORT,
            open: 0,
            max_open: 0,
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Makes opening a tunnel to `pod_name` fail with `kind`.
    pub async fn fail_pod(&self, pod_name: &str, kind: ErrorKind) {
        let mut inner = self.inner.lock().await;
        inner.failing.insert(pod_name.to_string(), kind);
    }

    /// Makes opening a tunnel to `pod_name` never complete.
    pub async fn hang_pod(&self, pod_name: &str) {
        let mut inner = self.inner.lock().await;
        inner.hanging.insert(pod_name.to_string());
    }

    pub async fn events(&self) -> Vec<TunnelEvent> {
        let inner = self.inner.lock().await;
        inner.events.clone()
    }

    /// Number of tunnels currently open.
    pub async fn open_count(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.open
    }

    /// Highest number of tunnels that were open at the same time.
    pub async fn max_open(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.max_open
    }
}

impl Default for FakeTunnelManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TunnelManager for FakeTunnelManager {
    type Tunnel = FakeTunnel;

    async fn open(
        &self,
        _namespace: &str,
        pod_name: &str,
        remote_port: u16,
    ) -> DbaResult<FakeTunnel> {
        let hanging = {
            let inner = self.inner.lock().await;
            if let Some(kind) = inner.failing.get(pod_name) {
                bail!(*kind, "Fake tunnel failure");
            }
            inner.hanging.contains(pod_name)
        };

        if hanging {
            std::future::pending::<()>().await;
        }

        let mut inner = self.inner.lock().await;
        let local_port = match inner.free_ports.pop_first() {
            Some(port) => port,
            None => {
                let port = inner.next_port;
                inner.next_port += 1;
                port
            }
        };

        inner.open += 1;
        inner.max_open = inner.max_open.max(inner.open);
        inner.events.push(TunnelEvent::Opened {
            pod_name: pod_name.to_string(),
            remote_port,
            local_port,
        });

        Ok(FakeTunnel {
            inner: self.inner.clone(),
            pod_name: pod_name.to_string(),
            local_port,
        })
    }
}

/// Tunnel handed out by [`FakeTunnelManager`].
#[derive(Debug)]
pub struct FakeTunnel {
    inner: Arc<Mutex<Inner>>,
    pod_name: String,
    local_port: u16,
}

impl Tunnel for FakeTunnel {
    fn local_port(&self) -> u16 {
        self.local_port
    }

    async fn close(self) {
        let mut inner = self.inner.lock().await;
        inner.open -= 1;
        inner.free_ports.insert(self.local_port);
        inner.events.push(TunnelEvent::Closed {
            pod_name: self.pod_name,
            local_port: self.local_port,
        });
    }
}
