use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::{ConnectOptions, Connection};
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::debug;

use crate::dba_error;
use crate::error::{DbaResult, ErrorKind};
use crate::probe::{PrimaryProbe, ProbeCandidate};

/// Host of the group member that reports itself as primary.
const PRIMARY_MEMBER_QUERY: &str = "select MEMBER_HOST from performance_schema.replication_group_members \
     INNER JOIN performance_schema.global_status \
     ON performance_schema.replication_group_members.MEMBER_ID=performance_schema.global_status.VARIABLE_VALUE";

/// Asks a MySQL group-replication member which host is primary.
///
/// A candidate is primary when the reported host is its pod name or a domain
/// name whose first label is its pod name.
#[derive(Debug, Clone)]
pub struct GroupReplicationProbe {
    timeout: Duration,
}

impl GroupReplicationProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn connect_options(&self, candidate: &ProbeCandidate) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&Ipv4Addr::LOCALHOST.to_string())
            .port(candidate.local_port)
            .username(&candidate.credentials.username)
            .password(candidate.credentials.password.expose_secret())
            .database("mysql")
    }
}

#[async_trait]
impl PrimaryProbe for GroupReplicationProbe {
    async fn is_primary(&self, candidate: &ProbeCandidate) -> DbaResult<bool> {
        let mut connection = tokio::time::timeout(
            self.timeout,
            self.connect_options(candidate).connect(),
        )
        .await
        .map_err(|_| {
            dba_error!(
                ErrorKind::ConnectFailed,
                "MySQL connection timed out",
                candidate.pod_name
            )
        })??;

        let primary_host: Option<String> = sqlx::query_scalar(PRIMARY_MEMBER_QUERY)
            .fetch_optional(&mut connection)
            .await?;

        connection.close().await?;

        let is_primary = primary_is(primary_host.as_deref(), &candidate.pod_name);
        debug!(pod = %candidate.pod_name, ?primary_host, is_primary, "group primary reported");

        Ok(is_primary)
    }
}

fn primary_is(primary_host: Option<&str>, pod_name: &str) -> bool {
    primary_host.is_some_and(|host| {
        host == pod_name
            || host
                .strip_prefix(pod_name)
                .is_some_and(|domain| domain.starts_with('.'))
    })
}
