//! One command invocation: resolve, tunnel, run the client, release.

use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::bail;
use crate::directory::ClusterDirectory;
use crate::error::{DbaResult, ErrorKind};
use crate::resolver::Resolver;
use crate::session::{Payload, SessionContext, SessionRunner};
use crate::tunnel::{Tunnel, TunnelManager};
use crate::types::{Credentials, Engine, ResolvedTarget};

/// What to do once connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Attach an interactive client to the terminal.
    Connect,
    /// Apply payloads in order against `database`.
    Apply {
        database: Option<String>,
        payloads: Vec<Payload>,
    },
}

impl Action {
    /// Builds an apply action; the command runs before the file.
    ///
    /// Empty values count as absent.
    pub fn apply(
        database: Option<String>,
        command: Option<String>,
        file: Option<PathBuf>,
    ) -> DbaResult<Action> {
        let command = command.filter(|command| !command.is_empty());
        let file = file.filter(|file| !file.as_os_str().is_empty());
        let payloads: Vec<Payload> = command
            .map(Payload::Command)
            .into_iter()
            .chain(file.map(Payload::File))
            .collect();

        if payloads.is_empty() {
            bail!(ErrorKind::InvalidData, "Apply needs a command or a file");
        }

        Ok(Action::Apply { database, payloads })
    }
}

/// A request against one named database instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub engine: Engine,
    pub namespace: String,
    pub name: String,
    pub action: Action,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.engine, self.namespace, self.name)
    }
}

/// Runs `invocation` end to end.
///
/// Exactly one session tunnel is opened after resolution succeeds and it is
/// closed whether or not the session succeeds.
pub async fn execute<D, T, S>(
    resolver: &Resolver<D, T>,
    runner: &S,
    invocation: &Invocation,
) -> DbaResult<()>
where
    D: ClusterDirectory,
    T: TunnelManager,
    S: SessionRunner + ?Sized,
{
    let target = resolver
        .resolve_primary(invocation.engine, &invocation.namespace, &invocation.name)
        .await?;
    let credentials = load_credentials(resolver.directory(), &target).await?;

    let tunnel = resolver
        .tunnels()
        .open(&target.namespace, &target.pod_name, target.remote_port)
        .await?;

    info!(%target, local_port = tunnel.local_port(), "session tunnel opened");

    let database = match &invocation.action {
        Action::Connect => None,
        Action::Apply { database, .. } => database.clone(),
    };
    let context = SessionContext {
        target,
        credentials,
        local_port: tunnel.local_port(),
        database,
    };

    let result = run_action(runner, &context, &invocation.action).await;

    tunnel.close().await;

    if let Err(err) = &result {
        warn!(target = %context.target, error = %err, "session failed");
    }

    result
}

async fn run_action<S>(runner: &S, context: &SessionContext, action: &Action) -> DbaResult<()>
where
    S: SessionRunner + ?Sized,
{
    match action {
        Action::Connect => runner.run_interactive(context).await,
        Action::Apply { payloads, .. } => {
            for payload in payloads {
                runner.run_batch(context, payload).await?;
                info!(%payload, "applied");
            }

            Ok(())
        }
    }
}

async fn load_credentials<D>(
    directory: &D,
    target: &ResolvedTarget,
) -> DbaResult<Option<Credentials>>
where
    D: ClusterDirectory,
{
    let Some(secret_name) = target.secret_name.as_deref() else {
        return Ok(None);
    };

    let secret = directory.get_secret(&target.namespace, secret_name).await?;

    secret.credentials(target.engine).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_runs_command_before_file() {
        let action = Action::apply(
            Some("shop".to_string()),
            Some("select 1".to_string()),
            Some(PathBuf::from("seed.sql")),
        )
        .unwrap();

        assert_eq!(
            action,
            Action::Apply {
                database: Some("shop".to_string()),
                payloads: vec![
                    Payload::Command("select 1".to_string()),
                    Payload::File(PathBuf::from("seed.sql")),
                ],
            }
        );
    }

    #[test]
    fn apply_without_payload_is_rejected() {
        let err = Action::apply(None, None, None).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn empty_command_counts_as_absent() {
        let err = Action::apply(None, Some(String::new()), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);

        let action = Action::apply(None, Some(String::new()), Some(PathBuf::from("seed.sql")))
            .unwrap();
        assert_eq!(
            action,
            Action::Apply {
                database: None,
                payloads: vec![Payload::File(PathBuf::from("seed.sql"))],
            }
        );
    }
}
