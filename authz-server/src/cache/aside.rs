//! Cache-aside access used by the resolvers.
//!
//! Callers look a key up here first; on a miss they load from the backing
//! store and write the result back with [`CacheAside::put`]. Cache failures
//! never fail a request: they are logged and treated as a miss.

use super::{Cache, CacheBackend, CacheError};
use crate::headers::ClientCacheControl;
use log::{debug, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Cached outcome of a backing-store lookup.
///
/// A store miss is cached as `Absent` so an unknown principal or group stays
/// distinguishable from one that exists with no groups or permissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Cached<T> {
    Present(T),
    Absent,
}

#[derive(Clone)]
pub struct CacheAside {
    cache: Arc<Cache>,
    op_timeout: Duration,
}

impl CacheAside {
    pub fn new(cache: Arc<Cache>, op_timeout: Duration) -> Self {
        Self { cache, op_timeout }
    }

    /// Look a key up, honouring the client's cache directives
    pub async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
        cache_control: &ClientCacheControl,
    ) -> Option<Cached<T>> {
        if !cache_control.should_use_cache() {
            debug!("Skipping cache lookup for {} due to client directives", key);
            return None;
        }

        match self.bounded(self.cache.get::<Cached<T>>(key)).await {
            Ok(Some(value)) => {
                debug!("Cache hit for key: {}", key);
                Some(value)
            }
            Ok(None) => {
                debug!("Cache miss for key: {}", key);
                None
            }
            Err(err) => {
                warn!("Cache error for key {}: {}", key, err);
                None
            }
        }
    }

    /// Write a freshly loaded value back, honouring the client's cache directives
    pub async fn put<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &Cached<T>,
        cache_control: &ClientCacheControl,
    ) {
        if !cache_control.should_store() {
            debug!("Skipping cache storage for {} due to no-store directive", key);
            return;
        }

        if let Err(err) = self.bounded(self.cache.set(key, value)).await {
            warn!("Failed to cache value for {}: {}", key, err);
        }
    }

    async fn bounded<R>(
        &self,
        operation: impl Future<Output = Result<R, CacheError>>,
    ) -> Result<R, CacheError> {
        tokio::time::timeout(self.op_timeout, operation)
            .await
            .map_err(|_| CacheError::Timeout(self.op_timeout))?
    }
}
