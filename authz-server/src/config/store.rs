use confique::Config;
use serde::Deserialize;

/// Which backing store holds the group and user entries
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(try_from = "String")]
pub enum StoreKind {
    /// JSON seed file loaded once at start-up
    #[default]
    File,
    /// Remote document store reached over HTTP
    Http,
}

/// Configuration for the backing store
#[derive(Debug, Config, Clone)]
pub struct StoreConfig {
    /// Store kind: "file" (default) or "http"
    #[config(env = "AUTHZ_STORE_KIND", default = "file")]
    pub kind: StoreKind,

    /// Path of the JSON seed file used by the "file" store
    #[config(env = "AUTHZ_STORE_PATH", default = "permissions.json")]
    pub path: String,

    /// Base URL of the "http" store
    #[config(env = "AUTHZ_STORE_URL")]
    pub url: Option<String>,

    /// Bearer key sent to the "http" store
    #[config(env = "AUTHZ_STORE_API_KEY")]
    pub api_key: Option<String>,

    /// Timeout for store requests in seconds (default: 2)
    #[config(env = "AUTHZ_STORE_TIMEOUT", default = 2)]
    pub timeout: u64,
}

impl TryFrom<String> for StoreKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim() {
            "file" => Ok(StoreKind::File),
            "http" => Ok(StoreKind::Http),
            other => Err(format!("unknown store kind '{other}', expected 'file' or 'http'")),
        }
    }
}
