//! Primary resolution and client sessions for KubeDB-managed databases.
//!
//! An invocation reads a database instance from the cluster, resolves the pod
//! that should receive the session according to the instance's topology, opens
//! a tunnel to that pod and runs the engine's client through it.
//!
//! The cluster, the tunnels, the primary probes and the client processes each
//! sit behind a trait ([`directory::ClusterDirectory`], [`tunnel::TunnelManager`],
//! [`probe::PrimaryProbe`], [`session::SessionRunner`]) so resolution can be
//! exercised without a cluster.

pub mod directory;
pub mod error;
pub mod invocation;
mod macros;
pub mod probe;
pub mod resolver;
pub mod session;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod tunnel;
pub mod types;
