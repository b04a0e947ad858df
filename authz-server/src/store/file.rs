use super::{BackingStore, StoreEntry, StoreError};
use async_trait::async_trait;
use log::info;
use std::collections::HashMap;

/// Store seeded from a JSON file holding an array of entries.
///
/// The file is read once at start-up; later edits need a restart.
#[derive(Debug, Clone, Default)]
pub struct FileStore {
    entries: HashMap<String, StoreEntry>,
}

impl FileStore {
    pub async fn load(path: &str) -> Result<Self, StoreError> {
        let raw = tokio::fs::read(path).await.map_err(|source| StoreError::Io {
            path: path.to_string(),
            source,
        })?;
        let entries: Vec<StoreEntry> = serde_json::from_slice(&raw)?;
        info!("Loaded {} store entries from {}", entries.len(), path);
        Ok(Self::from_entries(entries))
    }

    /// Later entries with the same id replace earlier ones
    pub fn from_entries(entries: impl IntoIterator<Item = StoreEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| (entry.group_or_user_id.clone(), entry))
            .collect();
        Self { entries }
    }
}

#[async_trait]
impl BackingStore for FileStore {
    async fn get_entry(&self, id: &str) -> Result<Option<StoreEntry>, StoreError> {
        Ok(self.entries.get(id).cloned())
    }

    async fn health_check(&self) -> Result<(), String> {
        Ok(())
    }
}
