use async_trait::async_trait;
use dba_config::shared::SessionConfig;
use secrecy::ExposeSecret;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{DbaResult, ErrorKind};
use crate::session::{
    ClientInput, ClientInvocation, ClientSpec, Payload, SessionContext, SessionMode, SessionRunner,
};
use crate::{bail, dba_error};

/// [`SessionRunner`] spawning the engine's client as a child process.
#[derive(Debug, Clone)]
pub struct ProcessSessionRunner {
    config: SessionConfig,
}

impl ProcessSessionRunner {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    async fn run(&self, context: &SessionContext, mode: SessionMode<'_>) -> DbaResult<()> {
        let spec = ClientSpec::new(context.target.engine, &self.config);
        let invocation = spec.invocation(context, mode)?;

        info!(
            engine = %spec.engine(),
            target = %context.target,
            local_port = context.local_port,
            program = %invocation.program,
            "starting client session"
        );

        run_client(invocation).await
    }
}

#[async_trait]
impl SessionRunner for ProcessSessionRunner {
    async fn run_interactive(&self, context: &SessionContext) -> DbaResult<()> {
        self.run(context, SessionMode::Interactive).await
    }

    async fn run_batch(&self, context: &SessionContext, payload: &Payload) -> DbaResult<()> {
        debug!(%payload, "applying payload");

        self.run(context, SessionMode::Batch(payload)).await
    }
}

/// Spawns the client, feeds its input and waits for it to exit.
///
/// Standard output and error are inherited. A non-zero exit fails with
/// [`ErrorKind::ClientExitFailure`].
pub async fn run_client(invocation: ClientInvocation) -> DbaResult<()> {
    let ClientInvocation {
        program,
        args,
        env,
        input,
    } = invocation;

    let mut command = Command::new(&program);
    command.args(&args).kill_on_drop(true);
    for (name, value) in &env {
        command.env(name, value.expose_secret());
    }

    let piped = match input {
        ClientInput::Inherit => {
            command.stdin(Stdio::inherit());
            None
        }
        ClientInput::Null => {
            command.stdin(Stdio::null());
            None
        }
        ClientInput::Bytes(bytes) => {
            command.stdin(Stdio::piped());
            Some(bytes)
        }
        ClientInput::File(path) => {
            let file = std::fs::File::open(&path).map_err(|err| {
                dba_error!(
                    ErrorKind::IoError,
                    "Failed to open the payload file",
                    format!("{}: {err}", path.display())
                )
            })?;
            command.stdin(Stdio::from(file));
            None
        }
    };

    let mut child = command.spawn().map_err(|err| {
        dba_error!(
            ErrorKind::IoError,
            "Failed to start the client program",
            format!("{program}: {err}")
        )
    })?;

    if let Some(bytes) = piped {
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&bytes).await?;
            stdin.shutdown().await?;
        }
    }

    let status = child.wait().await?;
    if !status.success() {
        bail!(
            ErrorKind::ClientExitFailure,
            "Client program exited unsuccessfully",
            format!("{program} {status}")
        );
    }

    debug!(%program, "client session finished");

    Ok(())
}
