pub(crate) use crate::config::cache::{CacheConfig, CacheStore};
#[cfg(test)]
pub(crate) use crate::config::cache::{InMemoryConfig, RedisConfig};
pub(crate) use crate::config::identity::IdentityConfig;
pub(crate) use crate::config::store::{StoreConfig, StoreKind};
use confique::Config;
use std::time::Duration;

pub mod cache;
pub mod identity;
pub mod store;

/// Environment variable naming an optional TOML configuration file
const CONFIG_FILE_ENV: &str = "AUTHZ_CONFIG_FILE";

/// Main configuration structure for the authorization server
#[derive(Debug, Config, Clone)]
pub struct AuthzConfig {
    /// The port the server will listen to (default: 7766)
    #[config(env = "AUTHZ_PORT", default = 7766)]
    pub port: u16,

    /// Deadline for a whole authorization decision in milliseconds (default: 3000)
    #[config(env = "AUTHZ_DECISION_TIMEOUT_MS", default = 3000)]
    pub decision_timeout_ms: u64,

    /// Cache configuration
    #[config(nested)]
    pub cache: CacheConfig,

    /// Backing store configuration
    #[config(nested)]
    pub store: StoreConfig,

    /// Identity provider configuration
    #[config(nested)]
    pub identity: IdentityConfig,
}

impl AuthzConfig {
    /// Creates a new configuration from environment variables, layered over
    /// the TOML file named by `AUTHZ_CONFIG_FILE` when it is set
    pub fn new() -> Result<Self, String> {
        let mut builder = Self::builder().env();
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            builder = builder.file(path);
        }
        builder.load().map_err(|e| e.to_string())
    }

    pub fn decision_timeout(&self) -> Duration {
        Duration::from_millis(self.decision_timeout_ms)
    }

    #[cfg(test)]
    pub fn for_test() -> Self {
        Self {
            port: 0, // Let the OS choose a port
            decision_timeout_ms: 1000,
            cache: CacheConfig {
                ttl: 60,
                store: CacheStore::InMemory,
                op_timeout_ms: 250,
                memory: InMemoryConfig { capacity: 16 },
                redis: RedisConfig { url: String::new() },
            },
            store: StoreConfig {
                kind: StoreKind::File,
                path: "permissions.json".to_string(),
                url: None,
                api_key: None,
                timeout: 1,
            },
            identity: IdentityConfig {
                tokeninfo_url: "http://127.0.0.1:1/tokeninfo".to_string(),
                issuers: vec!["https://issuer.test".to_string()],
                audience: "test-audience".to_string(),
                client_id: Some("test-client".to_string()),
                timeout: 1,
            },
        }
    }
}
