use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

use crate::error::DbaResult;
use crate::types::{Credentials, ResolvedTarget};

/// Input applied to a database in a batch session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A literal command string.
    Command(String),
    /// A file whose contents are applied.
    File(PathBuf),
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Command(_) => f.write_str("inline command"),
            Payload::File(path) => write!(f, "file {}", path.display()),
        }
    }
}

/// Everything a client needs to reach the target through a tunnel.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub target: ResolvedTarget,
    /// Absent for engines without a credential secret.
    pub credentials: Option<Credentials>,
    pub local_port: u16,
    /// Database, keyspace or index to use; engines fall back to their own default.
    pub database: Option<String>,
}

/// Runs external client sessions.
#[async_trait]
pub trait SessionRunner: Send + Sync {
    /// Runs a client attached to the invoking terminal.
    async fn run_interactive(&self, context: &SessionContext) -> DbaResult<()>;

    /// Runs a client that applies `payload` and exits.
    async fn run_batch(&self, context: &SessionContext, payload: &Payload) -> DbaResult<()>;
}
