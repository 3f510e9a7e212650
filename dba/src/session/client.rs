use dba_config::shared::{ClientRuntime, SessionConfig};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};

use crate::bail;
use crate::error::{DbaResult, ErrorKind};
use crate::session::{Payload, SessionContext};
use crate::types::{Credentials, Engine};

/// Address the clients connect to; the tunnel listens there.
const LOCAL_HOST: &str = "127.0.0.1";

/// What a session asks the client to do.
#[derive(Debug, Clone, Copy)]
pub enum SessionMode<'a> {
    Interactive,
    Batch(&'a Payload),
}

/// Where the client's standard input comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientInput {
    /// The invoking terminal.
    Inherit,
    /// Nothing.
    Null,
    /// Bytes written to a pipe, then closed.
    Bytes(Vec<u8>),
    /// A file opened as standard input.
    File(PathBuf),
}

/// A fully built client process invocation.
///
/// Environment values are kept as secrets and only exposed when the process
/// is spawned. Container runtimes receive the variable names alone.
pub struct ClientInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(&'static str, SecretString)>,
    pub input: ClientInput,
}

impl ClientInvocation {
    /// Returns the value of the environment variable `name`.
    pub fn env_value(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.expose_secret())
    }
}

/// Per-engine description of the client program and how it is launched.
#[derive(Debug, Clone)]
pub struct ClientSpec {
    engine: Engine,
    runtime: ClientRuntime,
    container_binary: String,
    image: String,
}

/// Arguments and environment of a client before the runtime wraps it.
struct ClientCall {
    args: Vec<String>,
    env: Vec<(&'static str, SecretString)>,
    input: ClientInput,
}

impl ClientSpec {
    pub fn new(engine: Engine, config: &SessionConfig) -> Self {
        let image = match engine {
            Engine::Postgres => &config.images.postgres,
            Engine::MySql => &config.images.mysql,
            Engine::MongoDb => &config.images.mongodb,
            Engine::Redis => &config.images.redis,
            Engine::Elasticsearch => &config.images.elasticsearch,
            Engine::Memcached => &config.images.memcached,
        };

        Self {
            engine,
            runtime: config.runtime,
            container_binary: config.container_binary.clone(),
            image: image.clone(),
        }
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    /// Returns `true` if the engine's client can apply commands or files.
    pub fn supports_batch(&self) -> bool {
        !matches!(self.engine, Engine::Elasticsearch | Engine::Memcached)
    }

    /// Client executable, inside the image or on `PATH`.
    pub fn binary(&self) -> &'static str {
        match self.engine {
            Engine::Postgres => "psql",
            Engine::MySql => "mysql",
            Engine::MongoDb => "mongo",
            Engine::Redis => "redis-cli",
            Engine::Elasticsearch => "sh",
            Engine::Memcached => "telnet",
        }
    }

    /// Database used when a session names none.
    pub fn default_database(&self) -> &'static str {
        match self.engine {
            Engine::Postgres => "postgres",
            Engine::MySql => "mysql",
            Engine::MongoDb => "admin",
            Engine::Redis => "0",
            Engine::Elasticsearch | Engine::Memcached => "",
        }
    }

    /// Path a batch file is mounted at inside the client container.
    fn container_file_path(&self) -> Option<&'static str> {
        match self.engine {
            Engine::Postgres => Some("/tmp/pgsql.sql"),
            Engine::MySql => Some("/tmp/my.sql"),
            Engine::MongoDb => Some("/home/mongo.js"),
            _ => None,
        }
    }

    /// The image's entrypoint already is the client.
    fn image_runs_client(&self) -> bool {
        matches!(self.engine, Engine::Elasticsearch | Engine::Memcached)
    }

    /// Builds the process invocation for a session.
    pub fn invocation(
        &self,
        context: &SessionContext,
        mode: SessionMode<'_>,
    ) -> DbaResult<ClientInvocation> {
        if let SessionMode::Batch(payload) = mode {
            if !self.supports_batch() {
                bail!(
                    ErrorKind::InvalidData,
                    "Engine client only supports interactive sessions",
                    format!("{} cannot apply {payload}", self.engine)
                );
            }
        }

        let mount = match mode {
            SessionMode::Batch(Payload::File(path)) => match self.container_file_path() {
                Some(container_path) => Some((std::fs::canonicalize(path)?, container_path)),
                None => None,
            },
            _ => None,
        };

        let file_arg = match (&mount, self.runtime) {
            (Some((_, container_path)), ClientRuntime::Container) => {
                Some(container_path.to_string())
            }
            (Some((host_path, _)), ClientRuntime::Local) => {
                Some(host_path.display().to_string())
            }
            (None, _) => None,
        };

        let call = self.client_call(context, mode, file_arg.as_deref())?;

        Ok(match self.runtime {
            ClientRuntime::Container => self.in_container(call, mode, mount.as_ref()),
            ClientRuntime::Local => ClientInvocation {
                program: self.binary().to_string(),
                args: call.args,
                env: call.env,
                input: call.input,
            },
        })
    }

    fn in_container(
        &self,
        call: ClientCall,
        mode: SessionMode<'_>,
        mount: Option<&(PathBuf, &'static str)>,
    ) -> ClientInvocation {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--network=host".to_string(),
        ];

        match (&mode, &call.input) {
            (SessionMode::Interactive, _) => args.push("-it".to_string()),
            (_, ClientInput::Bytes(_) | ClientInput::File(_)) => args.push("-i".to_string()),
            _ => {}
        }

        for (name, _) in &call.env {
            args.push("-e".to_string());
            args.push((*name).to_string());
        }

        if let Some((host_path, container_path)) = mount {
            args.push("-v".to_string());
            args.push(format!("{}:{container_path}", host_path.display()));
        }

        args.push(self.image.clone());
        if !self.image_runs_client() {
            args.push(self.binary().to_string());
        }
        args.extend(call.args);

        ClientInvocation {
            program: self.container_binary.clone(),
            args,
            env: call.env,
            input: call.input,
        }
    }

    fn client_call(
        &self,
        context: &SessionContext,
        mode: SessionMode<'_>,
        file_arg: Option<&str>,
    ) -> DbaResult<ClientCall> {
        let port = context.local_port.to_string();
        let database = context
            .database
            .as_deref()
            .filter(|database| !database.is_empty())
            .unwrap_or(self.default_database());
        let interactive_input = match mode {
            SessionMode::Interactive => ClientInput::Inherit,
            SessionMode::Batch(_) => ClientInput::Null,
        };

        let call = match self.engine {
            Engine::Postgres => {
                let credentials = self.credentials(context)?;
                let mut args = vec![
                    format!("--host={LOCAL_HOST}"),
                    format!("--port={port}"),
                    format!("--username={}", credentials.username),
                    format!("--dbname={database}"),
                ];
                match (mode, file_arg) {
                    (SessionMode::Batch(Payload::Command(command)), _) => {
                        args.push(format!("--command={command}"))
                    }
                    (SessionMode::Batch(Payload::File(_)), Some(file)) => {
                        args.push(format!("--file={file}"))
                    }
                    _ => {}
                }

                ClientCall {
                    args,
                    env: vec![("PGPASSWORD", credentials.password.clone())],
                    input: interactive_input,
                }
            }
            Engine::MySql => {
                let credentials = self.credentials(context)?;
                let mut args = vec![
                    format!("--host={LOCAL_HOST}"),
                    format!("--port={port}"),
                    format!("--user={}", credentials.username),
                    database.to_string(),
                ];
                match (mode, file_arg) {
                    (SessionMode::Batch(Payload::Command(command)), _) => {
                        args.extend(["-e".to_string(), command.clone()])
                    }
                    (SessionMode::Batch(Payload::File(_)), Some(file)) => {
                        args.extend(["-e".to_string(), format!("source {file}")])
                    }
                    _ => {}
                }

                ClientCall {
                    args,
                    env: vec![("MYSQL_PWD", credentials.password.clone())],
                    input: interactive_input,
                }
            }
            Engine::MongoDb => {
                let credentials = self.credentials(context)?;
                let mut args = vec![
                    database.to_string(),
                    format!("--host={LOCAL_HOST}"),
                    format!("--port={port}"),
                    format!("--username={}", credentials.username),
                    format!("--password={}", credentials.password.expose_secret()),
                ];
                match (mode, file_arg) {
                    (SessionMode::Batch(Payload::Command(command)), _) => {
                        args.extend(["--eval".to_string(), command.clone()])
                    }
                    (SessionMode::Batch(Payload::File(_)), Some(file)) => {
                        args.push(file.to_string())
                    }
                    _ => {}
                }

                ClientCall {
                    args,
                    env: Vec::new(),
                    input: interactive_input,
                }
            }
            Engine::Redis => {
                let input = match mode {
                    SessionMode::Interactive => ClientInput::Inherit,
                    SessionMode::Batch(Payload::Command(command)) => {
                        ClientInput::Bytes(redis_commands(command).into_bytes())
                    }
                    SessionMode::Batch(Payload::File(path)) => ClientInput::File(absolute(path)?),
                };

                // Cluster redirects name pod addresses the host cannot reach,
                // so MOVED replies are shown instead of followed.
                ClientCall {
                    args: vec![
                        "-h".to_string(),
                        LOCAL_HOST.to_string(),
                        "-p".to_string(),
                        port,
                        "-n".to_string(),
                        database.to_string(),
                    ],
                    env: Vec::new(),
                    input,
                }
            }
            Engine::Elasticsearch => {
                let credentials = self.credentials(context)?;

                ClientCall {
                    args: Vec::new(),
                    env: vec![
                        ("USERNAME", SecretString::from(credentials.username.clone())),
                        ("PASSWORD", credentials.password.clone()),
                        ("ADDRESS", SecretString::from(format!("localhost:{port}"))),
                    ],
                    input: ClientInput::Inherit,
                }
            }
            Engine::Memcached => ClientCall {
                args: vec![LOCAL_HOST.to_string(), port],
                env: Vec::new(),
                input: ClientInput::Inherit,
            },
        };

        Ok(call)
    }

    fn credentials<'a>(&self, context: &'a SessionContext) -> DbaResult<&'a Credentials> {
        match &context.credentials {
            Some(credentials) => Ok(credentials),
            None => bail!(
                ErrorKind::InvalidData,
                "Session requires credentials",
                format!("{} target {}", self.engine, context.target)
            ),
        }
    }
}

/// Turns `;`-separated commands into one command per line.
pub fn redis_commands(command: &str) -> String {
    command.replace(';', "\n")
}

fn absolute(path: &Path) -> DbaResult<PathBuf> {
    Ok(std::fs::canonicalize(path)?)
}
