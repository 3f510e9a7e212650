use crate::types::{
    DatabaseInstance, Engine, LABEL_DATABASE_KIND, LABEL_DATABASE_NAME, Phase, PodCandidate,
    Topology,
};

/// A running instance with the given topology.
pub fn running_instance(
    engine: Engine,
    namespace: &str,
    name: &str,
    topology: Topology,
    secret_name: Option<&str>,
) -> DatabaseInstance {
    DatabaseInstance {
        engine,
        name: name.to_string(),
        namespace: namespace.to_string(),
        topology,
        phase: Phase::Running,
        secret_name: secret_name.map(str::to_string),
    }
}

/// A pod of `instance` carrying its kind and name labels.
pub fn instance_pod(instance: &DatabaseInstance, pod_name: &str) -> PodCandidate {
    PodCandidate::new(pod_name, instance.namespace.as_str())
        .with_label(LABEL_DATABASE_KIND, instance.engine.kind())
        .with_label(LABEL_DATABASE_NAME, instance.name.as_str())
}

/// Ordinal pods `<name>-0` up to `<name>-<count - 1>` of `instance`.
pub fn ordinal_pods(instance: &DatabaseInstance, count: u32) -> Vec<PodCandidate> {
    (0..count)
        .map(|ordinal| instance_pod(instance, &instance.ordinal_pod_name(ordinal)))
        .collect()
}
