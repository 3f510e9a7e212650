use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// How client programs are launched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRuntime {
    /// Run the client inside a container with host networking.
    #[default]
    Container,
    /// Run the client binary from `PATH`.
    Local,
}

/// Container images holding each engine's client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientImages {
    pub postgres: String,
    pub mysql: String,
    pub mongodb: String,
    pub redis: String,
    pub elasticsearch: String,
    pub memcached: String,
}

impl Default for ClientImages {
    fn default() -> Self {
        Self {
            postgres: "postgres:11.1-alpine".to_string(),
            mysql: "mysql".to_string(),
            mongodb: "mongo:latest".to_string(),
            redis: "redis:alpine".to_string(),
            elasticsearch: "rezoan/alpine-curl:latest".to_string(),
            memcached: "rezoan/telnet-curl:latest".to_string(),
        }
    }
}

impl ClientImages {
    fn named(&self) -> [(&'static str, &str); 6] {
        [
            ("postgres", &self.postgres),
            ("mysql", &self.mysql),
            ("mongodb", &self.mongodb),
            ("redis", &self.redis),
            ("elasticsearch", &self.elasticsearch),
            ("memcached", &self.memcached),
        ]
    }
}

/// Settings for the external client sessions.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub runtime: ClientRuntime,
    /// Container runtime executable, used when `runtime` is `container`.
    pub container_binary: String,
    pub images: ClientImages,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.runtime != ClientRuntime::Container {
            return Ok(());
        }

        if self.container_binary.trim().is_empty() {
            return Err(ValidationError::EmptyContainerBinary);
        }

        for (engine, image) in self.images.named() {
            if image.trim().is_empty() {
                return Err(ValidationError::EmptyClientImage(engine));
            }
        }

        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            runtime: ClientRuntime::Container,
            container_binary: "docker".to_string(),
            images: ClientImages::default(),
        }
    }
}
