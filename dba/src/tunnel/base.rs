use std::future::Future;

use crate::error::DbaResult;

/// An open forward from a local port to a pod port.
pub trait Tunnel: Send {
    /// Local port bound on `127.0.0.1`.
    fn local_port(&self) -> u16;

    /// Terminates the forward and releases the local port.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Opens tunnels to pods.
pub trait TunnelManager: Send + Sync {
    type Tunnel: Tunnel;

    /// Opens a forward to `remote_port` of `pod_name`.
    ///
    /// Resolves once the forward is confirmed ready; fails with
    /// [`crate::error::ErrorKind::ConnectFailed`] otherwise. There is no
    /// keep-alive or reconnection.
    fn open(
        &self,
        namespace: &str,
        pod_name: &str,
        remote_port: u16,
    ) -> impl Future<Output = DbaResult<Self::Tunnel>> + Send;
}
