use dba::error::ErrorKind;
use dba::probe::ProbeSet;
use dba::resolver::Resolver;
use dba::test_utils::directory::{DirectoryCall, MemoryDirectory};
use dba::test_utils::fixtures::{instance_pod, ordinal_pods, running_instance};
use dba::test_utils::probe::{FakeProbe, ProbeOutcome};
use dba::test_utils::tunnel::{FakeTunnelManager, TunnelEvent};
use dba::types::{
    CLIENT_ROLE_VALUE, DatabaseInstance, Engine, LABEL_CLIENT_ROLE, LABEL_ROLE, PRIMARY_ROLE,
    Phase, ResolvedTarget, Topology,
};
use dba_config::shared::{ProbeConfig, ScanBound};
use dba_telemetry::init_test_tracing;

struct Harness {
    directory: MemoryDirectory,
    tunnels: FakeTunnelManager,
    probe: FakeProbe,
}

impl Harness {
    fn new() -> Self {
        Self {
            directory: MemoryDirectory::new(),
            tunnels: FakeTunnelManager::new(),
            probe: FakeProbe::new(),
        }
    }

    fn resolver(&self) -> Resolver<MemoryDirectory, FakeTunnelManager> {
        self.resolver_with(ProbeConfig::default())
    }

    fn resolver_with(&self, config: ProbeConfig) -> Resolver<MemoryDirectory, FakeTunnelManager> {
        let probes = ProbeSet::new()
            .with_probe(Engine::MongoDb, self.probe.clone())
            .with_probe(Engine::MySql, self.probe.clone());

        Resolver::new(
            self.directory.clone(),
            self.tunnels.clone(),
            probes,
            config,
        )
    }

    async fn add_replica_set(&self, engine: Engine, name: &str, replicas: u32) -> DatabaseInstance {
        let secret_name = format!("{name}-auth");
        let instance = running_instance(
            engine,
            "db",
            name,
            Topology::ReplicaSet { replicas },
            Some(&secret_name),
        );

        self.directory.add_instance(instance.clone()).await;
        self.directory
            .add_secret(
                "db",
                &secret_name,
                &[("username", "root"), ("password", "s3cr3t")],
            )
            .await;
        self.directory
            .add_pods(ordinal_pods(&instance, replicas))
            .await;

        instance
    }
}

#[tokio::test]
async fn standalone_resolves_to_ordinal_zero_without_tunnel() {
    init_test_tracing();
    let harness = Harness::new();
    let instance = running_instance(
        Engine::Postgres,
        "db",
        "pg1",
        Topology::Standalone,
        Some("pg1-auth"),
    );
    harness.directory.add_instance(instance.clone()).await;
    harness
        .directory
        .add_pods([instance_pod(&instance, "pg1-2"), instance_pod(&instance, "pg1-0")])
        .await;

    let target = harness
        .resolver()
        .resolve_primary(Engine::Postgres, "db", "pg1")
        .await
        .unwrap();

    assert_eq!(
        target,
        ResolvedTarget {
            engine: Engine::Postgres,
            namespace: "db".to_string(),
            pod_name: "pg1-0".to_string(),
            secret_name: Some("pg1-auth".to_string()),
            remote_port: 5432,
        }
    );
    assert!(harness.tunnels.events().await.is_empty());
    assert!(harness.probe.probed().await.is_empty());
    assert_eq!(harness.directory.calls().await.len(), 1);
}

#[tokio::test]
async fn instance_that_is_not_running_is_rejected_after_a_single_fetch() {
    init_test_tracing();
    let harness = Harness::new();
    let mut instance = running_instance(
        Engine::MongoDb,
        "db",
        "rs1",
        Topology::ReplicaSet { replicas: 3 },
        Some("rs1-auth"),
    );
    instance.phase = Phase::Provisioning;
    harness.directory.add_instance(instance).await;

    let err = harness
        .resolver()
        .resolve_primary(Engine::MongoDb, "db", "rs1")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotReady);
    assert_eq!(
        harness.directory.calls().await,
        vec![DirectoryCall::GetInstance {
            engine: Engine::MongoDb,
            namespace: "db".to_string(),
            name: "rs1".to_string(),
        }]
    );
    assert!(harness.tunnels.events().await.is_empty());
}

#[tokio::test]
async fn missing_instance_is_not_found() {
    init_test_tracing();
    let harness = Harness::new();

    let err = harness
        .resolver()
        .resolve_primary(Engine::Redis, "db", "ghost")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.detail().unwrap().starts_with("redis db/ghost"));
}

async fn add_labeled_cluster(harness: &Harness, primaries: &[u32]) {
    let instance = running_instance(
        Engine::Postgres,
        "db",
        "pg",
        Topology::LabeledPrimaryCluster { replicas: 3 },
        Some("pg-auth"),
    );
    harness.directory.add_instance(instance.clone()).await;

    for ordinal in 0..3 {
        let mut pod = instance_pod(&instance, &instance.ordinal_pod_name(ordinal));
        if primaries.contains(&ordinal) {
            pod = pod.with_label(LABEL_ROLE, PRIMARY_ROLE);
        } else {
            pod = pod.with_label(LABEL_ROLE, "replica");
        }
        harness.directory.add_pod(pod).await;
    }
}

#[tokio::test]
async fn labeled_primary_cluster_returns_the_labeled_pod() {
    init_test_tracing();
    let harness = Harness::new();
    add_labeled_cluster(&harness, &[2]).await;

    let target = harness
        .resolver()
        .resolve_primary(Engine::Postgres, "db", "pg")
        .await
        .unwrap();

    assert_eq!(target.pod_name, "pg-2");
    assert_eq!(target.secret_name.as_deref(), Some("pg-auth"));
    assert!(harness.tunnels.events().await.is_empty());
}

#[tokio::test]
async fn labeled_primary_cluster_without_primary_fails() {
    init_test_tracing();
    let harness = Harness::new();
    add_labeled_cluster(&harness, &[]).await;

    let err = harness
        .resolver()
        .resolve_primary(Engine::Postgres, "db", "pg")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoPrimaryFound);
}

#[tokio::test]
async fn labeled_primary_cluster_with_two_primaries_picks_lowest_ordinal() {
    init_test_tracing();
    let harness = Harness::new();
    add_labeled_cluster(&harness, &[1, 2]).await;

    let target = harness
        .resolver()
        .resolve_primary(Engine::Postgres, "db", "pg")
        .await
        .unwrap();

    assert_eq!(target.pod_name, "pg-1");
    let pod_fetches = harness
        .directory
        .calls()
        .await
        .into_iter()
        .filter(|call| matches!(call, DirectoryCall::GetPod { .. }))
        .count();
    assert_eq!(pod_fetches, 2);
}

#[tokio::test]
async fn labeled_primary_cluster_with_missing_pod_aborts() {
    init_test_tracing();
    let harness = Harness::new();
    let instance = running_instance(
        Engine::Postgres,
        "db",
        "pg",
        Topology::LabeledPrimaryCluster { replicas: 3 },
        Some("pg-auth"),
    );
    harness.directory.add_instance(instance.clone()).await;
    harness
        .directory
        .add_pod(instance_pod(&instance, "pg-1").with_label(LABEL_ROLE, PRIMARY_ROLE))
        .await;

    let err = harness
        .resolver()
        .resolve_primary(Engine::Postgres, "db", "pg")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.detail().unwrap().starts_with("postgres db/pg: "));
}

#[tokio::test]
async fn replica_set_probes_ordinals_sequentially() {
    init_test_tracing();
    let harness = Harness::new();
    harness.add_replica_set(Engine::MongoDb, "rs", 3).await;
    harness.probe.script("rs-1", ProbeOutcome::Primary).await;

    let target = harness
        .resolver()
        .resolve_primary(Engine::MongoDb, "db", "rs")
        .await
        .unwrap();

    assert_eq!(target.pod_name, "rs-1");
    assert_eq!(target.remote_port, 27017);
    assert_eq!(
        harness.tunnels.events().await,
        vec![
            TunnelEvent::Opened {
                pod_name: "rs-0".to_string(),
                remote_port: 27017,
                local_port: 40_000,
            },
            TunnelEvent::Closed {
                pod_name: "rs-0".to_string(),
                local_port: 40_000,
            },
            TunnelEvent::Opened {
                pod_name: "rs-1".to_string(),
                remote_port: 27017,
                local_port: 40_000,
            },
            TunnelEvent::Closed {
                pod_name: "rs-1".to_string(),
                local_port: 40_000,
            },
        ]
    );
    assert_eq!(harness.tunnels.max_open().await, 1);
    assert_eq!(harness.tunnels.open_count().await, 0);
    assert_eq!(
        harness.probe.probed().await,
        vec![("rs-0".to_string(), 40_000), ("rs-1".to_string(), 40_000)]
    );
}

#[tokio::test]
async fn replica_set_fetches_credentials_once() {
    init_test_tracing();
    let harness = Harness::new();
    harness.add_replica_set(Engine::MySql, "my", 3).await;
    harness.probe.script("my-2", ProbeOutcome::Primary).await;

    let target = harness
        .resolver()
        .resolve_primary(Engine::MySql, "db", "my")
        .await
        .unwrap();

    assert_eq!(target.pod_name, "my-2");
    assert_eq!(target.remote_port, 3306);
    let secret_fetches = harness
        .directory
        .calls()
        .await
        .into_iter()
        .filter(|call| matches!(call, DirectoryCall::GetSecret { .. }))
        .count();
    assert_eq!(secret_fetches, 1);
}

#[tokio::test]
async fn unreachable_member_is_skipped() {
    init_test_tracing();
    let harness = Harness::new();
    harness.add_replica_set(Engine::MongoDb, "rs1", 2).await;
    harness
        .tunnels
        .fail_pod("rs1-0", ErrorKind::ConnectFailed)
        .await;
    harness.probe.script("rs1-1", ProbeOutcome::Primary).await;

    let target = harness
        .resolver()
        .resolve_primary(Engine::MongoDb, "db", "rs1")
        .await
        .unwrap();

    assert_eq!(target.pod_name, "rs1-1");
    assert_eq!(
        harness.probe.probed().await,
        vec![("rs1-1".to_string(), 40_000)]
    );
}

#[tokio::test(start_paused = true)]
async fn member_whose_tunnel_hangs_times_out_and_is_skipped() {
    init_test_tracing();
    let harness = Harness::new();
    harness.add_replica_set(Engine::MongoDb, "rs1", 2).await;
    harness.tunnels.hang_pod("rs1-0").await;
    harness.probe.script("rs1-1", ProbeOutcome::Primary).await;

    let target = harness
        .resolver()
        .resolve_primary(Engine::MongoDb, "db", "rs1")
        .await
        .unwrap();

    assert_eq!(target.pod_name, "rs1-1");
}

#[tokio::test(start_paused = true)]
async fn member_whose_probe_hangs_times_out_and_its_tunnel_is_closed() {
    init_test_tracing();
    let harness = Harness::new();
    harness.add_replica_set(Engine::MongoDb, "rs1", 2).await;
    harness.probe.script("rs1-0", ProbeOutcome::Hang).await;
    harness.probe.script("rs1-1", ProbeOutcome::Primary).await;

    let target = harness
        .resolver()
        .resolve_primary(Engine::MongoDb, "db", "rs1")
        .await
        .unwrap();

    assert_eq!(target.pod_name, "rs1-1");
    assert_eq!(harness.tunnels.open_count().await, 0);
    assert_eq!(harness.tunnels.max_open().await, 1);
}

#[tokio::test]
async fn failing_probe_is_treated_as_not_primary() {
    init_test_tracing();
    let harness = Harness::new();
    harness.add_replica_set(Engine::MySql, "my", 2).await;
    harness
        .probe
        .script("my-0", ProbeOutcome::Fail(ErrorKind::ProbeFailed))
        .await;
    harness.probe.script("my-1", ProbeOutcome::Primary).await;

    let target = harness
        .resolver()
        .resolve_primary(Engine::MySql, "db", "my")
        .await
        .unwrap();

    assert_eq!(target.pod_name, "my-1");
}

#[tokio::test]
async fn replica_set_without_primary_fails_after_full_scan() {
    init_test_tracing();
    let harness = Harness::new();
    harness.add_replica_set(Engine::MongoDb, "rs", 3).await;
    harness
        .tunnels
        .fail_pod("rs-2", ErrorKind::ConnectFailed)
        .await;

    let err = harness
        .resolver()
        .resolve_primary(Engine::MongoDb, "db", "rs")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoPrimaryFound);
    assert_eq!(harness.probe.probed().await.len(), 2);
    assert_eq!(harness.tunnels.open_count().await, 0);

    let detail = err.detail().unwrap();
    assert!(detail.starts_with("mongodb db/rs: 1 of 3 pods could not be probed"));
    assert!(detail.contains("ConnectFailed: Fake tunnel failure -> rs-2"));
}

#[tokio::test]
async fn replica_set_without_primary_lists_every_skipped_member() {
    init_test_tracing();
    let harness = Harness::new();
    harness.add_replica_set(Engine::MySql, "my", 2).await;
    harness
        .tunnels
        .fail_pod("my-0", ErrorKind::ConnectFailed)
        .await;
    harness
        .probe
        .script("my-1", ProbeOutcome::Fail(ErrorKind::ProbeFailed))
        .await;

    let err = harness
        .resolver()
        .resolve_primary(Engine::MySql, "db", "my")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoPrimaryFound);
    let detail = err.detail().unwrap();
    assert!(detail.contains("2 of 2 pods could not be probed"));
    assert!(detail.contains("Multiple errors occurred (2 total)"));
    assert!(detail.contains("-> my-0"));
    assert!(detail.contains("-> my-1"));
}

#[tokio::test]
async fn replica_set_where_every_member_is_secondary_reports_no_skips() {
    init_test_tracing();
    let harness = Harness::new();
    harness.add_replica_set(Engine::MongoDb, "rs", 2).await;

    let err = harness
        .resolver()
        .resolve_primary(Engine::MongoDb, "db", "rs")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoPrimaryFound);
    assert_eq!(err.detail(), Some("mongodb db/rs: none of 2 pods is primary"));
}

#[tokio::test]
async fn cluster_error_during_scan_aborts_resolution() {
    init_test_tracing();
    let harness = Harness::new();
    harness.add_replica_set(Engine::MongoDb, "rs", 3).await;
    harness
        .tunnels
        .fail_pod("rs-0", ErrorKind::Unauthorized)
        .await;
    harness.probe.script("rs-1", ProbeOutcome::Primary).await;

    let err = harness
        .resolver()
        .resolve_primary(Engine::MongoDb, "db", "rs")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(err.detail().unwrap().starts_with("mongodb db/rs: rs-0"));
    assert!(harness.probe.probed().await.is_empty());
}

#[tokio::test]
async fn missing_credential_secret_aborts_before_probing() {
    init_test_tracing();
    let harness = Harness::new();
    let instance = running_instance(
        Engine::MongoDb,
        "db",
        "rs",
        Topology::ReplicaSet { replicas: 2 },
        Some("rs-auth"),
    );
    harness.directory.add_instance(instance).await;

    let err = harness
        .resolver()
        .resolve_primary(Engine::MongoDb, "db", "rs")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(harness.tunnels.events().await.is_empty());
}

#[tokio::test]
async fn declared_scan_bound_stops_at_the_replica_count() {
    init_test_tracing();
    let harness = Harness::new();
    harness.add_replica_set(Engine::MongoDb, "rs", 2).await;
    harness.probe.script("rs-2", ProbeOutcome::Primary).await;

    let err = harness
        .resolver()
        .resolve_primary(Engine::MongoDb, "db", "rs")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoPrimaryFound);
    let probed: Vec<String> = harness
        .probe
        .probed()
        .await
        .into_iter()
        .map(|(pod_name, _)| pod_name)
        .collect();
    assert_eq!(probed, vec!["rs-0", "rs-1"]);
}

#[tokio::test]
async fn inclusive_scan_bound_visits_one_extra_ordinal() {
    init_test_tracing();
    let harness = Harness::new();
    harness.add_replica_set(Engine::MongoDb, "rs", 2).await;
    harness.probe.script("rs-2", ProbeOutcome::Primary).await;
    let config = ProbeConfig {
        scan_bound: ScanBound::DeclaredPlusOne,
        ..ProbeConfig::default()
    };

    let target = harness
        .resolver_with(config)
        .resolve_primary(Engine::MongoDb, "db", "rs")
        .await
        .unwrap();

    assert_eq!(target.pod_name, "rs-2");
}

#[tokio::test]
async fn inclusive_scan_bound_counts_the_extra_ordinal_as_scanned() {
    init_test_tracing();
    let harness = Harness::new();
    harness.add_replica_set(Engine::MongoDb, "rs", 2).await;
    harness
        .tunnels
        .fail_pod("rs-2", ErrorKind::ConnectFailed)
        .await;
    let config = ProbeConfig {
        scan_bound: ScanBound::DeclaredPlusOne,
        ..ProbeConfig::default()
    };

    let err = harness
        .resolver_with(config)
        .resolve_primary(Engine::MongoDb, "db", "rs")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoPrimaryFound);
    assert!(
        err.detail()
            .unwrap()
            .contains("1 of 3 pods could not be probed")
    );
}

#[tokio::test]
async fn replica_set_without_registered_probe_is_invalid() {
    init_test_tracing();
    let harness = Harness::new();
    harness.add_replica_set(Engine::MongoDb, "rs", 2).await;
    let resolver = Resolver::new(
        harness.directory.clone(),
        harness.tunnels.clone(),
        ProbeSet::new(),
        ProbeConfig::default(),
    );

    let err = resolver
        .resolve_primary(Engine::MongoDb, "db", "rs")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidData);
    assert_eq!(err.detail(), Some("mongodb db/rs: mongodb"));
}

#[tokio::test]
async fn sharded_cluster_resolves_lowest_router() {
    init_test_tracing();
    let harness = Harness::new();
    let instance = running_instance(
        Engine::MongoDb,
        "db",
        "mg",
        Topology::ShardedCluster,
        Some("mg-auth"),
    );
    harness.directory.add_instance(instance.clone()).await;
    harness
        .directory
        .add_pods([
            instance_pod(&instance, "mg-shard0-0"),
            instance_pod(&instance, "mg-configsvr-0"),
            instance_pod(&instance, "mg-mongos-1"),
            instance_pod(&instance, "mg-mongos-0"),
        ])
        .await;

    let target = harness
        .resolver()
        .resolve_primary(Engine::MongoDb, "db", "mg")
        .await
        .unwrap();

    assert_eq!(target.pod_name, "mg-mongos-0");
    assert!(harness.tunnels.events().await.is_empty());
}

#[tokio::test]
async fn sharded_cluster_without_router_fails() {
    init_test_tracing();
    let harness = Harness::new();
    let instance = running_instance(
        Engine::MongoDb,
        "db",
        "mg",
        Topology::ShardedCluster,
        Some("mg-auth"),
    );
    harness.directory.add_instance(instance.clone()).await;
    harness
        .directory
        .add_pod(instance_pod(&instance, "mg-shard0-0"))
        .await;

    let err = harness
        .resolver()
        .resolve_primary(Engine::MongoDb, "db", "mg")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoPrimaryFound);
}

#[tokio::test]
async fn client_role_cluster_prefers_dedicated_client_nodes() {
    init_test_tracing();
    let harness = Harness::new();
    let instance = running_instance(
        Engine::Elasticsearch,
        "db",
        "es",
        Topology::ClientRoleCluster {
            dedicated_client_nodes: true,
        },
        Some("es-auth"),
    );
    harness.directory.add_instance(instance.clone()).await;
    harness
        .directory
        .add_pods([
            instance_pod(&instance, "es-master-0"),
            instance_pod(&instance, "es-client-1").with_label(LABEL_CLIENT_ROLE, CLIENT_ROLE_VALUE),
            instance_pod(&instance, "es-client-0").with_label(LABEL_CLIENT_ROLE, CLIENT_ROLE_VALUE),
        ])
        .await;

    let target = harness
        .resolver()
        .resolve_primary(Engine::Elasticsearch, "db", "es")
        .await
        .unwrap();

    assert_eq!(target.pod_name, "es-client-0");
    assert_eq!(target.secret_name.as_deref(), Some("es-auth"));
    assert_eq!(target.remote_port, 9200);
}

#[tokio::test]
async fn client_role_cluster_without_dedicated_nodes_uses_any_pod() {
    init_test_tracing();
    let harness = Harness::new();
    let instance = running_instance(
        Engine::Redis,
        "db",
        "rd",
        Topology::ClientRoleCluster {
            dedicated_client_nodes: false,
        },
        None,
    );
    harness.directory.add_instance(instance.clone()).await;
    harness
        .directory
        .add_pods([instance_pod(&instance, "rd-2"), instance_pod(&instance, "rd-0")])
        .await;

    let target = harness
        .resolver()
        .resolve_primary(Engine::Redis, "db", "rd")
        .await
        .unwrap();

    assert_eq!(target.pod_name, "rd-0");
    assert_eq!(target.secret_name, None);
}

#[tokio::test]
async fn client_role_cluster_without_pods_fails() {
    init_test_tracing();
    let harness = Harness::new();
    let instance = running_instance(
        Engine::Memcached,
        "db",
        "mc",
        Topology::ClientRoleCluster {
            dedicated_client_nodes: false,
        },
        None,
    );
    harness.directory.add_instance(instance).await;

    let err = harness
        .resolver()
        .resolve_primary(Engine::Memcached, "db", "mc")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoPrimaryFound);
}
