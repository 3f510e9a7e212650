use async_trait::async_trait;
use mongodb::Client;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, Credential, ServerAddress};
use secrecy::ExposeSecret;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::debug;

use crate::error::DbaResult;
use crate::probe::{PrimaryProbe, ProbeCandidate};

/// User the replica-set members are probed as.
const PROBE_USER: &str = "root";

/// Database holding the administrative commands.
const ADMIN_DATABASE: &str = "admin";

/// Runs `isMaster` against a single replica-set member.
///
/// The connection is direct so the driver does not follow the member to the
/// current primary.
#[derive(Debug, Clone)]
pub struct MongoPrimaryProbe {
    timeout: Duration,
}

impl MongoPrimaryProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn client_options(&self, candidate: &ProbeCandidate) -> ClientOptions {
        let mut credential = Credential::default();
        credential.username = Some(PROBE_USER.to_string());
        credential.password = Some(candidate.credentials.password.expose_secret().to_string());
        credential.source = Some(ADMIN_DATABASE.to_string());

        let mut options = ClientOptions::default();
        options.hosts = vec![ServerAddress::Tcp {
            host: Ipv4Addr::LOCALHOST.to_string(),
            port: Some(candidate.local_port),
        }];
        options.direct_connection = Some(true);
        options.credential = Some(credential);
        options.connect_timeout = Some(self.timeout);
        options.server_selection_timeout = Some(self.timeout);
        options.app_name = Some("kubectl-dba".to_string());

        options
    }
}

#[async_trait]
impl PrimaryProbe for MongoPrimaryProbe {
    async fn is_primary(&self, candidate: &ProbeCandidate) -> DbaResult<bool> {
        let client = Client::with_options(self.client_options(candidate))?;
        let admin = client.database(ADMIN_DATABASE);

        admin.run_command(doc! { "ping": 1 }).await?;
        let reply = admin.run_command(doc! { "isMaster": 1 }).await?;
        let is_primary = reply.get_bool("ismaster").unwrap_or(false);

        debug!(pod = %candidate.pod_name, is_primary, "isMaster answered");

        client.shutdown().await;

        Ok(is_primary)
    }
}
