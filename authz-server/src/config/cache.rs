use confique::Config;
use serde::Deserialize;

/// Specifies which cache store implementation to use
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(from = "String")]
pub enum CacheStore {
    #[default]
    InMemory,
    Redis,
    None,
}

impl From<String> for CacheStore {
    fn from(value: String) -> Self {
        match value.trim() {
            "in-memory" => CacheStore::InMemory,
            "redis" => CacheStore::Redis,
            // Unknown values disable caching
            _ => CacheStore::None,
        }
    }
}

/// Configuration for the caching subsystem
#[derive(Debug, Config, Clone)]
pub struct CacheConfig {
    /// Cache TTL in seconds, counted from the last backing-store load (default: 1 hour)
    #[config(env = "AUTHZ_CACHE_TTL", default = 3600)]
    pub ttl: u64,

    /// Cache store type: "in-memory" (default), "redis" or "none"
    #[config(env = "AUTHZ_CACHE_STORE", default = "in-memory")]
    pub store: CacheStore,

    /// Upper bound for a single cache get/set in milliseconds (default: 250)
    #[config(env = "AUTHZ_CACHE_OP_TIMEOUT_MS", default = 250)]
    pub op_timeout_ms: u64,

    /// In-memory cache specific configuration
    #[config(nested)]
    pub memory: InMemoryConfig,

    /// Redis cache specific configuration
    #[config(nested)]
    pub redis: RedisConfig,
}

/// In-memory cache configuration options
#[derive(Debug, Config, Clone)]
pub struct InMemoryConfig {
    /// Maximum capacity in MiB (default: 128 MiB)
    #[config(env = "AUTHZ_CACHE_MEMORY_CAPACITY", default = 128)]
    pub capacity: usize,
}

/// Redis cache configuration options
#[derive(Debug, Config, Clone)]
pub struct RedisConfig {
    /// Redis connection string
    #[config(env = "AUTHZ_CACHE_REDIS_URL", default = "")]
    pub url: String,
}
