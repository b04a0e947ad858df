use crate::{
    cache::{create_cache, Cache, CacheAside, CacheBackend},
    config::AuthzConfig,
    identity::{tokeninfo::TokenInfoProvider, IdentityProvider, TokenValidator},
    pipeline::{AuthorizationPipeline, Guard},
    resolver::{MembershipResolver, PermissionAggregator, PermissionResolver},
    store::{create_store, BackingStore},
};
use log::info;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AuthzConfig>,
    pub cache: Arc<Cache>,
    pub store: Arc<dyn BackingStore>,
    pub validator: Arc<TokenValidator>,
    pub pipeline: AuthorizationPipeline,
    pub guard: Guard,
}

impl AppState {
    pub async fn new(config: AuthzConfig) -> Result<Self, std::io::Error> {
        let cache = create_cache(&config).await.map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to create cache: {}", e),
            )
        })?;
        Self::with_existing_cache(config, cache).await
    }

    /// Build the state around a cache created by the caller
    pub async fn with_existing_cache(
        config: AuthzConfig,
        cache: Cache,
    ) -> Result<Self, std::io::Error> {
        let store = create_store(&config).await.map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to create backing store: {}", e),
            )
        })?;

        let provider = TokenInfoProvider::new(
            &config.identity.tokeninfo_url,
            config.identity.timeout,
        )
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        info!(
            "Using {:?} store and {:?} cache",
            config.store.kind, config.cache.store
        );
        Ok(Self::with_components(
            config,
            cache,
            store,
            Arc::new(provider),
        ))
    }

    /// Wire the resolvers, pipeline and guard over already built clients
    pub fn with_components(
        config: AuthzConfig,
        cache: Cache,
        store: Arc<dyn BackingStore>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let cache = Arc::new(cache);
        let cache_aside = CacheAside::new(
            cache.clone(),
            Duration::from_millis(config.cache.op_timeout_ms),
        );
        let validator = Arc::new(TokenValidator::new(provider, &config.identity));
        let membership = MembershipResolver::new(cache_aside.clone(), store.clone());
        let permissions = PermissionResolver::new(cache_aside, store.clone());

        Self {
            pipeline: AuthorizationPipeline::new(
                validator.clone(),
                membership.clone(),
                PermissionAggregator::new(permissions.clone()),
            ),
            guard: Guard::new(membership, permissions),
            config: Arc::new(config),
            cache,
            store,
            validator,
        }
    }

    /// Check if all components are healthy
    pub async fn health_check(&self) -> Result<(), String> {
        self.cache
            .health_check()
            .await
            .map_err(|e| format!("cache: {}", e))?;
        self.store
            .health_check()
            .await
            .map_err(|e| format!("store: {}", e))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::null::NullCache;
    use crate::config::{CacheStore, StoreKind};
    use crate::test_utils::{scenario_entries, CountingStore, StaticIdentityProvider};
    use std::io::Write;

    pub(crate) fn create_test_state(store: CountingStore) -> AppState {
        AppState::with_components(
            AuthzConfig::for_test(),
            Cache::Null(NullCache::new()),
            Arc::new(store),
            Arc::new(StaticIdentityProvider::new()),
        )
    }

    #[tokio::test]
    async fn test_app_state_new_with_seed_file() {
        let entries = serde_json::to_vec(&scenario_entries()).unwrap();
        let mut seed = tempfile::NamedTempFile::new().unwrap();
        seed.write_all(&entries).unwrap();

        let mut config = AuthzConfig::for_test();
        config.store.kind = StoreKind::File;
        config.store.path = seed.path().to_string_lossy().into_owned();
        config.cache.store = CacheStore::None;

        let state = AppState::new(config).await.unwrap();
        assert!(state.health_check().await.is_ok());
        assert!(state.store.get_entry("user1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_app_state_new_with_missing_seed_file() {
        let mut config = AuthzConfig::for_test();
        config.store.path = "/nonexistent/permissions.json".to_string();

        let result = AppState::new(config).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_health_check_reports_store_failure() {
        let state = create_test_state(CountingStore::failing());
        let err = state.health_check().await.unwrap_err();
        assert!(err.starts_with("store:"), "unexpected error: {err}");
    }

    #[test]
    fn test_app_state_clone() {
        let state = create_test_state(CountingStore::new(vec![]));
        let state2 = state.clone();

        // After cloning, both instances should point to the same data
        assert_eq!(Arc::as_ptr(&state.config), Arc::as_ptr(&state2.config));
        assert_eq!(Arc::as_ptr(&state.cache), Arc::as_ptr(&state2.cache));
        assert!(Arc::ptr_eq(&state.validator, &state2.validator));
    }
}
