use k8s_openapi::api::core::v1::Secret;
use secrecy::{ExposeSecret, SecretSlice, SecretString};
use std::collections::BTreeMap;

use crate::bail;
use crate::error::{DbaResult, ErrorKind};
use crate::types::Engine;

/// Opaque key-value credentials read from a cluster secret.
///
/// Values stay wrapped in [`secrecy`] containers and are only exposed when
/// handed to a client process or a probe connection.
#[derive(Debug)]
pub struct CredentialSecret {
    pub name: String,
    data: BTreeMap<String, SecretSlice<u8>>,
}

/// Username and password for a database session.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl CredentialSecret {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.data.insert(key.into(), SecretSlice::from(value.into()));
        self
    }

    /// Returns the UTF-8 value stored under `key`.
    pub fn get_string(&self, key: &str) -> DbaResult<SecretString> {
        let Some(value) = self.data.get(key) else {
            bail!(
                ErrorKind::InvalidData,
                "Credential secret is missing a key",
                format!("secret {} has no key {key}", self.name)
            );
        };

        match std::str::from_utf8(value.expose_secret()) {
            Ok(value) => Ok(SecretString::from(value.to_string())),
            Err(_) => bail!(
                ErrorKind::InvalidData,
                "Credential secret value is not valid UTF-8",
                format!("secret {} key {key}", self.name)
            ),
        }
    }

    /// Extracts the engine's username and password.
    pub fn credentials(&self, engine: Engine) -> DbaResult<Credentials> {
        let Some((username_key, password_key)) = credential_keys(engine) else {
            bail!(
                ErrorKind::InvalidData,
                "Engine does not use credentials",
                engine.name()
            );
        };

        Ok(Credentials {
            username: self.get_string(username_key)?.expose_secret().to_string(),
            password: self.get_string(password_key)?,
        })
    }
}

impl From<Secret> for CredentialSecret {
    fn from(secret: Secret) -> Self {
        let data = secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| (key, SecretSlice::from(value.0)))
            .collect();

        CredentialSecret {
            name: secret.metadata.name.unwrap_or_default(),
            data,
        }
    }
}

/// Secret keys holding the username and password for `engine`.
pub fn credential_keys(engine: Engine) -> Option<(&'static str, &'static str)> {
    match engine {
        Engine::Postgres => Some(("POSTGRES_USER", "POSTGRES_PASSWORD")),
        Engine::MySql | Engine::MongoDb => Some(("username", "password")),
        Engine::Elasticsearch => Some(("ADMIN_USERNAME", "ADMIN_PASSWORD")),
        Engine::Redis | Engine::Memcached => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn postgres_credentials_use_postgres_keys() {
        let secret = CredentialSecret::new("pg1-auth")
            .with_entry("POSTGRES_USER", "postgres")
            .with_entry("POSTGRES_PASSWORD", "hunter2");

        let credentials = secret.credentials(Engine::Postgres).unwrap();

        assert_eq!(credentials.username, "postgres");
        assert_eq!(credentials.password.expose_secret(), "hunter2");
    }

    #[test]
    fn missing_key_is_invalid_data() {
        let secret = CredentialSecret::new("rs1-auth").with_entry("username", "root");

        let err = secret.credentials(Engine::MongoDb).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert!(err.detail().unwrap().contains("password"));
    }

    #[test]
    fn converts_from_cluster_secret() {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some("my1-auth".to_string()),
                ..ObjectMeta::default()
            },
            data: Some(BTreeMap::from([
                ("username".to_string(), ByteString(b"root".to_vec())),
                ("password".to_string(), ByteString(b"pw".to_vec())),
            ])),
            ..Secret::default()
        };

        let secret = CredentialSecret::from(secret);

        assert_eq!(secret.name, "my1-auth");
        assert_eq!(secret.credentials(Engine::MySql).unwrap().username, "root");
    }

    #[test]
    fn cache_engines_have_no_credentials() {
        assert!(credential_keys(Engine::Redis).is_none());
        assert!(credential_keys(Engine::Memcached).is_none());
    }
}
