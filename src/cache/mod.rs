//! Request interception and caching for offline support.
//!
//! This module provides a payload-agnostic caching mechanism that:
//! - Keys every resource by its normalized locator (ephemeral params stripped)
//! - Resolves requests cache-first, network-first or stale-while-revalidate
//! - Only writes back successful, storable responses
//! - Degrades to network-only when no persistent store is available

mod key;
mod layer;
mod storage;
mod traits;

pub use key::CacheKey;
pub use layer::CacheLayer;
pub use storage::{NoopStorage, SqliteStorage};
pub use traits::{CacheResult, CacheSource, Cacheable, Policy};
