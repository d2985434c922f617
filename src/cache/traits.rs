//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::SyncError;

/// Trait for payloads that can be cached.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Resource kind name for storage organization (e.g., "attendance")
  fn resource_kind() -> &'static str;

  /// Whether this value may overwrite the cache slot.
  /// A successful response can still carry nothing worth keeping.
  fn is_storable(&self) -> bool {
    true
  }
}

/// How a request is resolved against cache and network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
  /// Serve cache; go to the network only on a miss (shell assets,
  /// repeat loads within a session)
  CacheFirst,
  /// Go to the network; fall back to cache, then to a default
  NetworkFirst,
  /// Serve cache now, refresh in the background
  StaleWhileRevalidate,
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
  /// Failure absorbed while producing this result
  pub error: Option<SyncError>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
      error: None,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
      error: None,
    }
  }

  /// Cached data served because the network failed.
  pub fn offline(data: T, cached_at: DateTime<Utc>, error: SyncError) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
      cached_at: Some(cached_at),
      error: Some(error),
    }
  }

  /// Synthesized value served because neither network nor cache had one.
  pub fn fallback(data: T, error: SyncError) -> Self {
    Self {
      data,
      source: CacheSource::Fallback,
      cached_at: None,
      error: Some(error),
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, network not consulted
  Cache,
  /// Network failed, serving cached data
  Offline,
  /// Nothing available, serving a synthesized default
  Fallback,
}

impl CacheSource {
  pub fn is_cached(self) -> bool {
    matches!(self, CacheSource::Cache | CacheSource::Offline)
  }
}
