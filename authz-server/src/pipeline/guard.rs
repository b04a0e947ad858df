use crate::headers::ClientCacheControl;
use crate::models::{Action, PermissionMap, Principal};
use crate::resolver::{MembershipResolver, PermissionResolver, Resolution};
use log::{debug, warn};
use std::future::Future;
use thiserror::Error;
use tokio::time::{timeout_at, Instant};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    #[error("Principal has no group memberships")]
    NoMembership,
    #[error("No group grants the required action")]
    InsufficientPermission,
    #[error("Permission check exceeded its deadline")]
    DeadlineExceeded,
}

/// Checks a single required action on one resource.
///
/// Membership is resolved first and an unknown or empty membership denies
/// without reading any group permissions. Groups are then checked one at a
/// time and the first group whose actions on the resource imply the
/// required action allows the call. A check still running at its deadline
/// is abandoned with [`Denial::DeadlineExceeded`].
#[derive(Clone)]
pub struct Guard {
    membership: MembershipResolver,
    permissions: PermissionResolver,
}

impl Guard {
    pub fn new(membership: MembershipResolver, permissions: PermissionResolver) -> Self {
        Self {
            membership,
            permissions,
        }
    }

    pub async fn check(
        &self,
        principal: &Principal,
        required: Action,
        resource: &str,
        cache_control: &ClientCacheControl,
        deadline: Instant,
    ) -> Result<(), Denial> {
        let evaluation = self.evaluate(principal, required, resource, cache_control);
        match timeout_at(deadline, evaluation).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    "Guard check of {} {} on {} exceeded its deadline",
                    principal, required, resource
                );
                Err(Denial::DeadlineExceeded)
            }
        }
    }

    async fn evaluate(
        &self,
        principal: &Principal,
        required: Action,
        resource: &str,
        cache_control: &ClientCacheControl,
    ) -> Result<(), Denial> {
        let groups = match self.membership.resolve_groups(principal, cache_control).await {
            Resolution::Found(groups) if !groups.is_empty() => groups,
            resolution => {
                warn!(
                    "Guard denied {} {} on {}: no membership ({:?})",
                    principal, required, resource, resolution
                );
                return Err(Denial::NoMembership);
            }
        };

        for group in &groups {
            let permissions = self
                .permissions
                .resolve_permissions(group, cache_control)
                .await
                .into_value();
            if grants(&permissions, resource, required) {
                debug!(
                    "Group {} grants {} {} on {}",
                    group, principal, required, resource
                );
                return Ok(());
            }
        }

        warn!(
            "Guard denied {} {} on {}: insufficient permission",
            principal, required, resource
        );
        Err(Denial::InsufficientPermission)
    }

    /// Run `operation` only when the principal holds `required` on `resource`.
    ///
    /// `deadline` bounds the check, not the operation.
    pub async fn run<F, Fut, T>(
        &self,
        principal: &Principal,
        required: Action,
        resource: &str,
        cache_control: &ClientCacheControl,
        deadline: Instant,
        operation: F,
    ) -> Result<T, Denial>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.check(principal, required, resource, cache_control, deadline)
            .await?;
        Ok(operation().await)
    }
}

/// Whether any action granted on exactly `resource` implies `required`.
///
/// Unrecognised action names grant nothing.
pub fn grants(permissions: &PermissionMap, resource: &str, required: Action) -> bool {
    permissions.get(resource).is_some_and(|actions| {
        actions
            .iter()
            .filter_map(|action| action.parse::<Action>().ok())
            .any(|action| action.implies(required))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BackingStore, StoreEntry};
    use crate::test_utils::{memory_cache_aside, scenario_entries, CountingStore};
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Arc;
    use std::time::Duration;

    fn guard(store: &CountingStore) -> Guard {
        let cache = memory_cache_aside();
        let store: Arc<dyn BackingStore> = Arc::new(store.clone());
        Guard::new(
            MembershipResolver::new(cache.clone(), store.clone()),
            PermissionResolver::new(cache, store),
        )
    }

    fn control() -> ClientCacheControl {
        ClientCacheControl::default()
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(1)
    }

    #[tokio::test]
    async fn test_user2_cannot_write_project_data() {
        let store = CountingStore::new(scenario_entries());
        let result = guard(&store)
            .check(&Principal::new("user2"), Action::Write, "Project_Data", &control(), deadline())
            .await;
        assert_eq!(result, Err(Denial::InsufficientPermission));
    }

    #[tokio::test]
    async fn test_user1_can_write_project_data() {
        let store = CountingStore::new(scenario_entries());
        let guard = guard(&store);
        let user1 = Principal::new("user1");

        assert_eq!(
            guard.check(&user1, Action::Write, "Project_Data", &control(), deadline()).await,
            Ok(())
        );
        assert_eq!(
            guard.check(&user1, Action::Read, "Public_Data", &control(), deadline()).await,
            Ok(())
        );
        assert_eq!(
            guard.check(&user1, Action::Delete, "Project_Data", &control(), deadline()).await,
            Err(Denial::InsufficientPermission)
        );
    }

    #[tokio::test]
    async fn test_no_membership_skips_permission_lookups() {
        let store = CountingStore::new(scenario_entries());
        let result = guard(&store)
            .check(&Principal::new("ghost"), Action::Read, "Public_Data", &control(), deadline())
            .await;
        assert_eq!(result, Err(Denial::NoMembership));
        assert_eq!(store.reads(), 1);
    }

    #[tokio::test]
    async fn test_first_satisfying_group_short_circuits() {
        let store = CountingStore::new(scenario_entries());
        let result = guard(&store)
            .check(&Principal::new("user1"), Action::Write, "Project_Data", &control(), deadline())
            .await;
        assert_eq!(result, Ok(()));
        // user1's membership and group1's permissions; group2 is never read
        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn test_admin_implies_every_action() {
        let permissions = BTreeMap::from([(
            "Reports".to_string(),
            BTreeSet::from(["admin".to_string()]),
        )]);
        let store = CountingStore::new(vec![
            StoreEntry::user("boss", &["managers"]),
            StoreEntry::group("managers", permissions),
        ]);
        let guard = guard(&store);
        let boss = Principal::new("boss");

        for action in [Action::Read, Action::Write, Action::Delete, Action::Admin] {
            assert_eq!(guard.check(&boss, action, "Reports", &control(), deadline()).await, Ok(()));
        }
        assert_eq!(
            guard.check(&boss, Action::Read, "Reports/2024", &control(), deadline()).await,
            Err(Denial::InsufficientPermission)
        );
    }

    #[tokio::test]
    async fn test_run_executes_only_when_permitted() {
        let store = CountingStore::new(scenario_entries());
        let guard = guard(&store);

        let allowed = guard
            .run(&Principal::new("user1"), Action::Read, "Public_Data", &control(), deadline(), || async {
                "payload"
            })
            .await;
        assert_eq!(allowed, Ok("payload"));

        let mut ran = false;
        let denied = guard
            .run(&Principal::new("user2"), Action::Write, "Project_Data", &control(), deadline(), || {
                ran = true;
                async {}
            })
            .await;
        assert_eq!(denied, Err(Denial::InsufficientPermission));
        assert!(!ran);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_exceeds_the_deadline() {
        let store = CountingStore::new(scenario_entries()).with_delay(Duration::from_secs(30));
        let guard = guard(&store);
        let started = Instant::now();

        let mut ran = false;
        let result = guard
            .run(&Principal::new("user1"), Action::Read, "Public_Data", &control(), deadline(), || {
                ran = true;
                async {}
            })
            .await;
        assert_eq!(result, Err(Denial::DeadlineExceeded));
        assert!(!ran);
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn test_grants_ignores_unknown_actions() {
        let permissions = BTreeMap::from([(
            "Project_Data".to_string(),
            BTreeSet::from(["fly".to_string(), "READ".to_string()]),
        )]);
        assert!(grants(&permissions, "Project_Data", Action::Read));
        assert!(!grants(&permissions, "Project_Data", Action::Write));
        assert!(!grants(&permissions, "Other", Action::Read));
    }
}
