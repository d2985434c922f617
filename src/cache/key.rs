//! Cache key derivation.
//!
//! Both the read path and the write path go through `CacheKey::normalize`,
//! so a forced request (`?refresh=1`) and a plain one share a slot.

use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

/// Query parameters that only exist to bust caches or force a refetch.
pub const EPHEMERAL_PARAMS: &[&str] = &["refresh", "force", "_", "ts"];

/// Normalized resource identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  locator: String,
}

impl CacheKey {
  /// Derive the key for a resource locator, stripping ephemeral parameters
  /// and the fragment.
  pub fn normalize(url: &Url) -> Self {
    let mut normalized = url.clone();
    normalized.set_fragment(None);

    let kept: Vec<(String, String)> = url
      .query_pairs()
      .filter(|(name, _)| !EPHEMERAL_PARAMS.contains(&name.as_ref()))
      .map(|(name, value)| (name.into_owned(), value.into_owned()))
      .collect();

    if kept.is_empty() {
      normalized.set_query(None);
    } else {
      normalized.query_pairs_mut().clear().extend_pairs(kept);
    }

    Self {
      locator: normalized.into(),
    }
  }

  /// Rebuild a key from a locator previously produced by `normalize`.
  pub fn from_locator(locator: impl Into<String>) -> Self {
    Self {
      locator: locator.into(),
    }
  }

  /// Human-readable normalized locator.
  pub fn locator(&self) -> &str {
    &self.locator
  }

  /// SHA256 of the locator, used as the storage primary key.
  pub fn digest(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.locator.as_bytes());
    hex::encode(hasher.finalize())
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.locator)
  }
}
