//! Read-only access to the cluster objects describing database instances.
//!
//! Consumers depend on [`ClusterDirectory`]; [`KubeDirectory`] talks to the
//! API server through [`kube`], and tests use the in-memory directory from
//! `test_utils`.

mod base;
mod kubernetes;

pub use self::base::*;
pub use self::kubernetes::*;
