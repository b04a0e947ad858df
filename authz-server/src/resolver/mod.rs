//! Cache-aside resolution of memberships and group permissions

use crate::cache::{CacheAside, Cached};
use crate::headers::ClientCacheControl;
use crate::store::{BackingStore, EntryKind, StoreEntry};
use log::warn;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

pub mod aggregate;
pub mod membership;
pub mod permissions;

pub use aggregate::PermissionAggregator;
pub use membership::MembershipResolver;
pub use permissions::PermissionResolver;

/// Outcome of resolving a principal or group.
///
/// Keeps "unknown" apart from "known with nothing granted"; a store fault
/// is reported separately and is never cached.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Found(T),
    NotFound,
    Unavailable,
}

impl<T: Default> Resolution<T> {
    /// Collapse to a value, degrading not-found and faults to empty
    pub fn into_value(self) -> T {
        match self {
            Resolution::Found(value) => value,
            Resolution::NotFound | Resolution::Unavailable => T::default(),
        }
    }
}

/// Shared cache-aside lookup: cache first, then the store, then populate.
///
/// `extract` maps a store entry of the expected `kind` to the cached value;
/// entries of the other kind count as absent.
async fn resolve_entry<T, F>(
    cache: &CacheAside,
    store: &Arc<dyn BackingStore>,
    key: &str,
    id: &str,
    kind: EntryKind,
    cache_control: &ClientCacheControl,
    extract: F,
) -> Resolution<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
    F: FnOnce(StoreEntry) -> T,
{
    if let Some(cached) = cache.get::<T>(key, cache_control).await {
        return match cached {
            Cached::Present(value) => Resolution::Found(value),
            Cached::Absent => Resolution::NotFound,
        };
    }

    let loaded = match store.get_entry(id).await {
        Ok(Some(entry)) if entry.kind == kind => Cached::Present(extract(entry)),
        Ok(Some(entry)) => {
            warn!(
                "Store entry '{}' is a {:?}, expected {:?}; treating as absent",
                id, entry.kind, kind
            );
            Cached::Absent
        }
        Ok(None) => Cached::Absent,
        Err(err) => {
            warn!("Failed to load '{}' from the backing store: {}", id, err);
            return Resolution::Unavailable;
        }
    };

    cache.put(key, &loaded, cache_control).await;
    match loaded {
        Cached::Present(value) => Resolution::Found(value),
        Cached::Absent => Resolution::NotFound,
    }
}
