use crate::config::{AuthzConfig, StoreKind};
use crate::models::{Group, PermissionMap};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub mod file;
pub mod remote;

/// Errors raised while reading the backing store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Store responded with status: {0}")]
    InvalidStatus(::http::StatusCode),
    #[error("Failed to parse store entry: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to read seed file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Kind of a backing-store entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Group,
    User,
}

/// One row of the backing table, keyed by `group_or_user_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub group_or_user_id: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Present on group entries: resource → actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionMap>,
    /// Present on user entries: group memberships
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<Group>>,
}

impl StoreEntry {
    pub fn user<S: Into<String>>(id: S, groups: &[&str]) -> Self {
        Self {
            group_or_user_id: id.into(),
            kind: EntryKind::User,
            permissions: None,
            groups: Some(groups.iter().map(|g| g.to_string()).collect()),
        }
    }

    pub fn group<S: Into<String>>(id: S, permissions: PermissionMap) -> Self {
        Self {
            group_or_user_id: id.into(),
            kind: EntryKind::Group,
            permissions: Some(permissions),
            groups: None,
        }
    }
}

/// Read access to the persistent table holding users and groups.
///
/// `Ok(None)` means the key does not exist; `Err` means the store could not
/// answer. The decision engine never writes to the store.
#[async_trait::async_trait]
pub trait BackingStore: Send + Sync {
    async fn get_entry(&self, id: &str) -> Result<Option<StoreEntry>, StoreError>;

    async fn health_check(&self) -> Result<(), String>;
}

/// Creates the backing store selected by the configuration
pub async fn create_store(config: &AuthzConfig) -> Result<Arc<dyn BackingStore>, StoreError> {
    match config.store.kind {
        StoreKind::File => {
            let store = file::FileStore::load(&config.store.path).await?;
            Ok(Arc::new(store))
        }
        StoreKind::Http => {
            let url = config.store.url.as_deref().ok_or_else(|| {
                StoreError::Config("AUTHZ_STORE_URL is required for the http store".to_string())
            })?;
            let store = remote::HttpStore::new(url, config.store.api_key.as_deref(), config.store.timeout)?;
            Ok(Arc::new(store))
        }
    }
}
