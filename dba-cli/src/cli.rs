use clap::{Args, Parser, Subcommand};
use dba::error::DbaResult;
use dba::invocation::{Action, Invocation};
use dba::types::Engine;
use std::path::PathBuf;
use tracing::warn;

/// Namespace used when none, or an empty one, is given.
pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Parser)]
#[command(name = "kubectl-dba")]
#[command(version)]
#[command(about = "Connect to and apply commands against KubeDB-managed databases")]
pub struct Cli {
    #[command(subcommand)]
    pub engine: EngineCommand,
}

#[derive(Debug, Subcommand)]
pub enum EngineCommand {
    /// Operate Postgres instances.
    Postgres {
        #[command(subcommand)]
        action: DatabaseAction,
    },
    /// Operate MySQL instances.
    Mysql {
        #[command(subcommand)]
        action: DatabaseAction,
    },
    /// Operate MongoDB instances.
    Mongodb {
        #[command(subcommand)]
        action: DatabaseAction,
    },
    /// Operate Redis instances.
    Redis {
        #[command(subcommand)]
        action: DatabaseAction,
    },
    /// Operate Elasticsearch instances.
    Elasticsearch {
        #[command(subcommand)]
        action: ConnectAction,
    },
    /// Operate Memcached instances.
    Memcached {
        #[command(subcommand)]
        action: ConnectAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum DatabaseAction {
    /// Open an interactive client against the instance's primary pod.
    Connect(TargetArgs),
    /// Apply a command or a file against the instance's primary pod.
    Apply(ApplyArgs),
}

#[derive(Debug, Subcommand)]
pub enum ConnectAction {
    /// Open an interactive client against the instance's client pod.
    Connect(TargetArgs),
}

#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Name of the database instance.
    pub name: String,

    /// Namespace of the database instance.
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Database to run against. Defaults to the engine's administrative database.
    #[arg(long, short = 'd')]
    pub dbname: Option<String>,

    /// Command to execute.
    #[arg(long, short = 'c', required_unless_present = "file")]
    pub command: Option<String>,

    /// Path to a file of commands to execute after `--command`.
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,
}

impl TargetArgs {
    fn namespace(&self) -> String {
        match self.namespace.as_deref() {
            Some(namespace) if !namespace.is_empty() => namespace.to_string(),
            _ => {
                warn!(
                    instance = %self.name,
                    "no namespace given, using the '{DEFAULT_NAMESPACE}' namespace"
                );
                DEFAULT_NAMESPACE.to_string()
            }
        }
    }
}

impl Cli {
    /// Turns the parsed command line into an [`Invocation`].
    pub fn into_invocation(self) -> DbaResult<Invocation> {
        let (engine, action) = match self.engine {
            EngineCommand::Postgres { action } => (Engine::Postgres, action),
            EngineCommand::Mysql { action } => (Engine::MySql, action),
            EngineCommand::Mongodb { action } => (Engine::MongoDb, action),
            EngineCommand::Redis { action } => (Engine::Redis, action),
            EngineCommand::Elasticsearch {
                action: ConnectAction::Connect(target),
            } => (Engine::Elasticsearch, DatabaseAction::Connect(target)),
            EngineCommand::Memcached {
                action: ConnectAction::Connect(target),
            } => (Engine::Memcached, DatabaseAction::Connect(target)),
        };

        let (target, action) = match action {
            DatabaseAction::Connect(target) => (target, Action::Connect),
            DatabaseAction::Apply(apply) => {
                let action = Action::apply(apply.dbname, apply.command, apply.file)?;
                (apply.target, action)
            }
        };

        Ok(Invocation {
            engine,
            namespace: target.namespace(),
            name: target.name,
            action,
        })
    }
}
