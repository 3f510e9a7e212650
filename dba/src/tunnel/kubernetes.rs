use k8s_openapi::api::core::v1::Pod;
use kube::Client;
use kube::api::Api;
use std::future::Future;
use std::net::Ipv4Addr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::dba_error;
use crate::error::{DbaResult, ErrorKind};
use crate::tunnel::{Tunnel, TunnelManager};

/// Byte stream to the remote end of one tunnel connection.
trait Upstream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> Upstream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Opens upstream streams for the connections accepted by a tunnel.
trait Connector: Send + Sync + 'static {
    fn connect(&self) -> impl Future<Output = DbaResult<Box<dyn Upstream>>> + Send;
}

/// Connects through the port-forward subresource of one pod.
struct PodConnector {
    pods: Api<Pod>,
    pod_name: String,
    remote_port: u16,
    target: String,
}

impl Connector for PodConnector {
    async fn connect(&self) -> DbaResult<Box<dyn Upstream>> {
        let mut forwarder = self
            .pods
            .portforward(&self.pod_name, &[self.remote_port])
            .await
            .map_err(|err| {
                dba_error!(
                    ErrorKind::ConnectFailed,
                    "Port-forward could not be established",
                    format!("{}: {err}", self.target)
                )
            })?;

        let Some(stream) = forwarder.take_stream(self.remote_port) else {
            return Err(dba_error!(
                ErrorKind::ConnectFailed,
                "Port-forward stream is missing",
                self.target
            ));
        };

        // The forwarder finishes once the stream is dropped.
        let target = self.target.clone();
        tokio::spawn(async move {
            if let Err(err) = forwarder.join().await {
                warn!(%target, "port-forward ended with an error: {err}");
            }
        });

        Ok(Box::new(stream))
    }
}

/// [`TunnelManager`] forwarding through the Kubernetes port-forward subresource.
#[derive(Clone)]
pub struct KubeTunnelManager {
    client: Client,
}

impl KubeTunnelManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl TunnelManager for KubeTunnelManager {
    type Tunnel = KubeTunnel;

    async fn open(
        &self,
        namespace: &str,
        pod_name: &str,
        remote_port: u16,
    ) -> DbaResult<KubeTunnel> {
        let connector = PodConnector {
            pods: Api::namespaced(self.client.clone(), namespace),
            pod_name: pod_name.to_string(),
            remote_port,
            target: format!("{namespace}/{pod_name}:{remote_port}"),
        };
        let target = connector.target.clone();

        open_tunnel(connector, target).await
    }
}

/// Binds a local port and forwards its connections through `connector`.
///
/// The first upstream is opened before returning. It confirms the remote end
/// is reachable and serves the first accepted connection.
async fn open_tunnel<C: Connector>(connector: C, target: String) -> DbaResult<KubeTunnel> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .map_err(|err| {
            dba_error!(
                ErrorKind::ConnectFailed,
                "Local port could not be bound",
                format!("{target}: {err}")
            )
        })?;
    let local_port = listener.local_addr()?.port();

    let ready = connector.connect().await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let task = tokio::spawn(accept_loop(
        connector,
        target.clone(),
        listener,
        ready,
        shutdown_rx,
    ));

    debug!(%target, local_port, "tunnel opened");

    Ok(KubeTunnel {
        target,
        local_port,
        shutdown_tx,
        task: Some(task),
    })
}

/// A tunnel backed by a background accept loop.
///
/// Dropping a tunnel that was not closed aborts the loop.
pub struct KubeTunnel {
    target: String,
    local_port: u16,
    shutdown_tx: watch::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl Tunnel for KubeTunnel {
    fn local_port(&self) -> u16 {
        self.local_port
    }

    async fn close(mut self) {
        let _ = self.shutdown_tx.send(());

        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(target = %self.target, "tunnel task ended abnormally: {err}");
            }
        }

        debug!(target = %self.target, local_port = self.local_port, "tunnel closed");
    }
}

impl Drop for KubeTunnel {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn accept_loop<C: Connector>(
    connector: C,
    target: String,
    listener: TcpListener,
    ready: Box<dyn Upstream>,
    mut shutdown_rx: watch::Receiver<()>,
) {
    let mut ready = Some(ready);
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        warn!(%target, "failed to accept tunnel connection: {err}");
                        continue;
                    }
                };

                let upstream = match ready.take() {
                    Some(upstream) => upstream,
                    None => match connector.connect().await {
                        Ok(upstream) => upstream,
                        Err(err) => {
                            warn!(%target, %peer, "failed to forward tunnel connection: {err}");
                            continue;
                        }
                    },
                };

                debug!(%target, %peer, "forwarding tunnel connection");
                connections.spawn(forward_connection(upstream, stream));
            }
            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                match finished {
                    Ok(Err(err)) => warn!(%target, "tunnel connection failed: {err}"),
                    Err(err) if err.is_panic() => warn!(%target, "tunnel connection panicked"),
                    _ => {}
                }
            }
        }
    }

    connections.shutdown().await;
    drop(listener);
}

async fn forward_connection(
    mut upstream: Box<dyn Upstream>,
    mut client: TcpStream,
) -> DbaResult<()> {
    tokio::io::copy_bidirectional(&mut client, &mut upstream).await?;

    Ok(())
}
