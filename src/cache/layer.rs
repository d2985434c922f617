//! Cache layer that orchestrates caching policies with network fetching.

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::SyncError;

use super::key::CacheKey;
use super::storage::CacheStore;
use super::traits::{CacheResult, Cacheable};

/// Cached value handed out now, plus the network attempt that will refresh it.
pub struct Revalidating<T> {
  pub cached: Option<CacheResult<T>>,
  /// Resolves once the network attempt finishes; the cache is not touched
  pub refresh: BoxFuture<'static, Result<T, SyncError>>,
}

/// Cache layer that manages caching policies and network fetching.
///
/// Only successful fetches are written back. Storage failures never reach
/// the caller as errors: a read failure is a miss, a write failure is logged
/// and the fetched value is still returned.
#[derive(Clone)]
pub struct CacheLayer {
  storage: Arc<dyn CacheStore>,
}

impl CacheLayer {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: impl CacheStore + 'static) -> Self {
    Self {
      storage: Arc::new(storage),
    }
  }

  /// Read a cached value without side effects.
  pub fn cached<T: Cacheable>(&self, key: &CacheKey) -> Option<CacheResult<T>> {
    let entry = match self.storage.get(key) {
      Ok(Some(entry)) => entry,
      Ok(None) => {
        debug!("Cache miss for {}", key);
        return None;
      }
      Err(e) => {
        warn!("Cache read failed for {}, treating as miss: {}", key, e);
        return None;
      }
    };

    match serde_json::from_slice::<T>(&entry.payload) {
      Ok(data) => {
        debug!("Cache hit for {} ({}, cached at {})", key, entry.kind, entry.cached_at);
        Some(CacheResult::from_cache(data, entry.cached_at))
      }
      Err(e) => {
        warn!("Discarding undecodable cache entry {}: {}", key, e);
        None
      }
    }
  }

  /// Overwrite the slot for `key`. Values that are not storable are skipped.
  pub fn store<T: Cacheable>(&self, key: &CacheKey, value: &T) -> Result<(), SyncError> {
    if !value.is_storable() {
      debug!("Not caching unstorable {} for {}", T::resource_kind(), key);
      return Ok(());
    }

    let payload = serde_json::to_vec(value).map_err(|e| SyncError::CacheWrite(e.to_string()))?;
    self
      .storage
      .put(key, T::resource_kind(), &payload)
      .map_err(|e| SyncError::CacheWrite(e.to_string()))
  }

  /// Drop every entry.
  pub fn clear(&self) -> Result<usize, SyncError> {
    self
      .storage
      .clear()
      .map_err(|e| SyncError::CacheUnavailable(e.to_string()))
  }

  /// Store, logging instead of failing.
  pub fn commit<T: Cacheable>(&self, key: &CacheKey, value: &T) {
    if let Err(e) = self.store(key, value) {
      warn!("{} (serving the fetched value anyway)", e);
    }
  }

  /// Cache-first strategy.
  ///
  /// 1. Cache hit - return it, network untouched
  /// 2. Miss - fetch, store, return
  pub async fn cache_first<T, F, Fut>(
    &self,
    key: &CacheKey,
    fetcher: F,
  ) -> Result<CacheResult<T>, SyncError>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
  {
    if let Some(cached) = self.cached(key) {
      return Ok(cached);
    }

    let data = fetcher().await?;
    self.commit(key, &data);
    Ok(CacheResult::from_network(data))
  }

  /// Network-first strategy. Always yields something renderable.
  ///
  /// 1. Fetch - on success store and return
  /// 2. On failure return the cached value (offline mode)
  /// 3. With no cache either, return `T::default()` tagged as fallback
  pub async fn network_first<T, F, Fut>(&self, key: &CacheKey, fetcher: F) -> CacheResult<T>
  where
    T: Cacheable + Default,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
  {
    match fetcher().await {
      Ok(data) => {
        self.commit(key, &data);
        CacheResult::from_network(data)
      }
      Err(error) => match self.cached::<T>(key) {
        Some(cached) => {
          debug!("Network failed for {}, serving cache: {}", key, error);
          let cached_at = cached.cached_at.unwrap_or_default();
          CacheResult::offline(cached.data, cached_at, error)
        }
        None => {
          warn!("Network failed for {} and nothing cached: {}", key, error);
          CacheResult::fallback(T::default(), error)
        }
      },
    }
  }

  /// Stale-while-revalidate strategy.
  ///
  /// Returns the cached value immediately together with a future that
  /// performs the network attempt. Nothing is fetched until the future is
  /// polled, so callers decide where it runs. The fetched value is not
  /// written back: pass it to `commit` once it is known to still be wanted.
  pub fn stale_while_revalidate<T, F, Fut>(&self, key: &CacheKey, fetcher: F) -> Revalidating<T>
  where
    T: Cacheable,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, SyncError>> + Send + 'static,
  {
    Revalidating {
      cached: self.cached(key),
      refresh: Box::pin(async move { fetcher().await }),
    }
  }

}
