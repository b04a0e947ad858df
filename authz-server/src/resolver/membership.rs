use super::{resolve_entry, Resolution};
use crate::cache::CacheAside;
use crate::headers::ClientCacheControl;
use crate::models::{Group, Principal};
use crate::store::{BackingStore, EntryKind};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Resolves the groups a principal belongs to
#[derive(Clone)]
pub struct MembershipResolver {
    cache: CacheAside,
    store: Arc<dyn BackingStore>,
}

impl MembershipResolver {
    pub fn new(cache: CacheAside, store: Arc<dyn BackingStore>) -> Self {
        Self { cache, store }
    }

    pub fn cache_key(principal: &Principal) -> String {
        format!("user_groups:{}", principal)
    }

    pub async fn resolve_groups(
        &self,
        principal: &Principal,
        cache_control: &ClientCacheControl,
    ) -> Resolution<BTreeSet<Group>> {
        resolve_entry(
            &self.cache,
            &self.store,
            &Self::cache_key(principal),
            principal.as_str(),
            EntryKind::User,
            cache_control,
            |entry| entry.groups.unwrap_or_default().into_iter().collect(),
        )
        .await
    }
}
