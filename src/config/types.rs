use serde::Deserialize;

/// Number of workers used when the config leaves `max_workers` unset or zero
pub const DEFAULT_MAX_WORKERS: usize = 200;

/// Namespace used when the config leaves `namespace` unset or empty
pub const DEFAULT_NAMESPACE: &str = "test";

/// Port of the key-value store when the config does not name one
pub const DEFAULT_PORT: u16 = 6379;

/// Base URL of the remote content API
pub const DEFAULT_API_BASE: &str = "http://api.soundcloud.com";

/// Main configuration structure for Sonar-Sweep
///
/// Loaded from a JSON file such as:
///
/// ```json
/// { "host": "127.0.0.1", "client_id": "abc123", "max_workers": 200 }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Host of the key-value store
    #[serde(default)]
    pub host: String,

    /// API client id sent with every request
    #[serde(default)]
    pub client_id: String,

    /// Number of parallel workers per phase
    #[serde(default)]
    pub max_workers: Option<usize>,

    /// Storage namespace (names the SQLite database of the direct backend)
    #[serde(default)]
    pub namespace: Option<String>,

    /// Port of the key-value store
    #[serde(default = "default_port")]
    pub port: u16,

    /// Which storage backend records are written to
    #[serde(default)]
    pub backend: Backend,

    /// Base URL of the remote API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Explicit SQLite database path for the direct backend
    #[serde(default)]
    pub database_path: Option<String>,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Redis hashes and sets: durable queue, sentinels and counters
    #[default]
    Redis,

    /// SQLite upsert-by-id; no durable queue and no counters
    Sqlite,
}

impl Config {
    /// Worker pool size, falling back to the default for unset or zero values
    pub fn worker_count(&self) -> usize {
        match self.max_workers {
            Some(n) if n > 0 => n,
            _ => DEFAULT_MAX_WORKERS,
        }
    }

    /// Effective namespace
    pub fn namespace(&self) -> &str {
        match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => ns,
            _ => DEFAULT_NAMESPACE,
        }
    }

    /// Connection URL for the Redis backend
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }

    /// Database file used by the SQLite backend
    pub fn sqlite_path(&self) -> String {
        match &self.database_path {
            Some(path) => path.clone(),
            None => format!("{}.sqlite3", self.namespace()),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}
