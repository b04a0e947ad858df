use super::{PermissionResolver, Resolution};
use crate::headers::ClientCacheControl;
use crate::models::{AggregatedPermissions, Group, PermissionMap};
use futures::future::join_all;
use log::warn;
use std::collections::BTreeSet;

/// Unions the permissions of every group a principal belongs to
#[derive(Clone)]
pub struct PermissionAggregator {
    resolver: PermissionResolver,
}

impl PermissionAggregator {
    pub fn new(resolver: PermissionResolver) -> Self {
        Self { resolver }
    }

    /// Resolve every group's permission map concurrently.
    ///
    /// Unknown groups and store faults contribute an empty map.
    pub async fn resolve_all(
        &self,
        groups: &BTreeSet<Group>,
        cache_control: &ClientCacheControl,
    ) -> Vec<PermissionMap> {
        let lookups = groups.iter().map(|group| async move {
            match self.resolver.resolve_permissions(group, cache_control).await {
                Resolution::Found(permissions) => permissions,
                Resolution::NotFound => {
                    warn!("Group '{}' has no backing-store entry", group);
                    PermissionMap::new()
                }
                Resolution::Unavailable => {
                    warn!("Permissions of group '{}' unavailable, treating as empty", group);
                    PermissionMap::new()
                }
            }
        });
        join_all(lookups).await
    }

    /// Resolve and union the permissions of `groups`
    pub async fn aggregate(
        &self,
        groups: &BTreeSet<Group>,
        cache_control: &ClientCacheControl,
    ) -> AggregatedPermissions {
        union(self.resolve_all(groups, cache_control).await)
    }
}

/// Per-resource set union of permission maps; order of `maps` is irrelevant
pub fn union<I>(maps: I) -> AggregatedPermissions
where
    I: IntoIterator<Item = PermissionMap>,
{
    maps.into_iter()
        .fold(AggregatedPermissions::new(), |mut aggregated, map| {
            for (resource, actions) in map {
                aggregated.entry(resource).or_default().extend(actions);
            }
            aggregated
        })
}
