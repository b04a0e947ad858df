use super::{resolve_entry, Resolution};
use crate::cache::CacheAside;
use crate::headers::ClientCacheControl;
use crate::models::PermissionMap;
use crate::store::{BackingStore, EntryKind};
use std::sync::Arc;

/// Resolves a group's resource → actions map
#[derive(Clone)]
pub struct PermissionResolver {
    cache: CacheAside,
    store: Arc<dyn BackingStore>,
}

impl PermissionResolver {
    pub fn new(cache: CacheAside, store: Arc<dyn BackingStore>) -> Self {
        Self { cache, store }
    }

    pub fn cache_key(group: &str) -> String {
        format!("group_permissions:{}", group)
    }

    pub async fn resolve_permissions(
        &self,
        group: &str,
        cache_control: &ClientCacheControl,
    ) -> Resolution<PermissionMap> {
        resolve_entry(
            &self.cache,
            &self.store,
            &Self::cache_key(group),
            group,
            EntryKind::Group,
            cache_control,
            |entry| entry.permissions.unwrap_or_default(),
        )
        .await
    }
}
