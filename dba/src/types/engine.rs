use std::fmt;

/// API group of the database custom resources.
pub const KUBEDB_GROUP: &str = "kubedb.com";

/// API version of the database custom resources.
pub const KUBEDB_VERSION: &str = "v1alpha1";

/// Label carrying the resource kind of the instance owning a pod.
pub const LABEL_DATABASE_KIND: &str = "kubedb.com/kind";

/// Label carrying the name of the instance owning a pod.
pub const LABEL_DATABASE_NAME: &str = "kubedb.com/name";

/// Label set by the role sidecar on labeled-primary engines.
pub const LABEL_ROLE: &str = "kubedb.com/role";

/// Value of [`LABEL_ROLE`] on the current primary.
pub const PRIMARY_ROLE: &str = "primary";

/// Label marking an Elasticsearch client node, with value [`CLIENT_ROLE_VALUE`].
pub const LABEL_CLIENT_ROLE: &str = "node.role.client";

pub const CLIENT_ROLE_VALUE: &str = "set";

/// A database engine managed through a custom resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    Postgres,
    MySql,
    MongoDb,
    Redis,
    Elasticsearch,
    Memcached,
}

impl Engine {
    pub const ALL: [Engine; 6] = [
        Engine::Postgres,
        Engine::MySql,
        Engine::MongoDb,
        Engine::Redis,
        Engine::Elasticsearch,
        Engine::Memcached,
    ];

    /// Resource kind, also the value of [`LABEL_DATABASE_KIND`] on the engine's pods.
    pub fn kind(self) -> &'static str {
        match self {
            Engine::Postgres => "Postgres",
            Engine::MySql => "MySQL",
            Engine::MongoDb => "MongoDB",
            Engine::Redis => "Redis",
            Engine::Elasticsearch => "Elasticsearch",
            Engine::Memcached => "Memcached",
        }
    }

    /// Plural resource name used in API paths.
    pub fn plural(self) -> &'static str {
        match self {
            Engine::Postgres => "postgreses",
            Engine::MySql => "mysqls",
            Engine::MongoDb => "mongodbs",
            Engine::Redis => "redises",
            Engine::Elasticsearch => "elasticsearches",
            Engine::Memcached => "memcacheds",
        }
    }

    /// Well-known service port of the engine's pods.
    pub fn service_port(self) -> u16 {
        match self {
            Engine::Postgres => 5432,
            Engine::MySql => 3306,
            Engine::MongoDb => 27017,
            Engine::Redis => 6379,
            Engine::Elasticsearch => 9200,
            Engine::Memcached => 11211,
        }
    }

    /// Lowercase name used on the command line and in logs.
    pub fn name(self) -> &'static str {
        match self {
            Engine::Postgres => "postgres",
            Engine::MySql => "mysql",
            Engine::MongoDb => "mongodb",
            Engine::Redis => "redis",
            Engine::Elasticsearch => "elasticsearch",
            Engine::Memcached => "memcached",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_ports_match_engine_defaults() {
        assert_eq!(Engine::Postgres.service_port(), 5432);
        assert_eq!(Engine::MySql.service_port(), 3306);
        assert_eq!(Engine::MongoDb.service_port(), 27017);
        assert_eq!(Engine::Redis.service_port(), 6379);
        assert_eq!(Engine::Elasticsearch.service_port(), 9200);
        assert_eq!(Engine::Memcached.service_port(), 11211);
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = Engine::ALL.iter().map(|e| e.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Engine::ALL.len());
    }
}
