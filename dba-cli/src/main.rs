use clap::Parser;
use dba_telemetry::{init_tracing, set_global_engine, set_global_instance};
use tracing::error;

use crate::cli::Cli;
use crate::config::load_dba_config;
use crate::core::run_with_config;

mod cli;
mod config;
mod core;

fn main() -> anyhow::Result<()> {
    // Usage errors exit here, before any configuration or cluster access.
    let cli = Cli::parse();

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME"))?;

    let invocation = cli.into_invocation()?;
    set_global_engine(invocation.engine.name().to_string());
    set_global_instance(format!("{}/{}", invocation.namespace, invocation.name));

    let config = match load_dba_config() {
        Ok(config) => config,
        Err(err) => {
            error!("failed to load configuration: {err}");
            return Err(err);
        }
    };

    // We start the runtime.
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run_with_config(config, invocation))?;

    Ok(())
}
