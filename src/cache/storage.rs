//! Cache storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::key::CacheKey;

/// A stored payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
  pub kind: String,
  pub payload: Vec<u8>,
  /// When the entry was written
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
///
/// Writes are atomic per key; nothing is transactional across a read and a
/// following write.
pub trait CacheStore: Send + Sync {
  fn get(&self, key: &CacheKey) -> Result<Option<StoredEntry>>;

  /// Overwrite the slot for `key`.
  fn put(&self, key: &CacheKey, kind: &str, payload: &[u8]) -> Result<()>;

  /// Returns whether an entry existed.
  fn delete(&self, key: &CacheKey) -> Result<bool>;

  fn keys(&self) -> Result<Vec<CacheKey>>;

  /// Remove every entry, returning how many were removed.
  fn clear(&self) -> Result<usize> {
    let mut removed = 0;
    for key in self.keys()? {
      if self.delete(&key)? {
        removed += 1;
      }
    }
    Ok(removed)
  }
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled or unavailable - all operations are no-ops.
pub struct NoopStorage;

impl CacheStore for NoopStorage {
  fn get(&self, _key: &CacheKey) -> Result<Option<StoredEntry>> {
    Ok(None) // Always miss
  }

  fn put(&self, _key: &CacheKey, _kind: &str, _payload: &[u8]) -> Result<()> {
    Ok(()) // Discard
  }

  fn delete(&self, _key: &CacheKey) -> Result<bool> {
    Ok(false)
  }

  fn keys(&self) -> Result<Vec<CacheKey>> {
    Ok(Vec::new())
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) the cache database at `path`, or the default location.
  pub fn open(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path()?,
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Cache that lives only as long as the process.
  #[cfg(test)]
  pub fn in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("attendr").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    key_hash TEXT PRIMARY KEY,
    locator TEXT NOT NULL,
    kind TEXT NOT NULL,
    payload BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl CacheStore for SqliteStorage {
  fn get(&self, key: &CacheKey) -> Result<Option<StoredEntry>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(String, Vec<u8>, String)> = conn
      .query_row(
        "SELECT kind, payload, cached_at FROM cache_entries WHERE key_hash = ?",
        params![key.digest()],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache entry {}: {}", key, e))?;

    match row {
      Some((kind, payload, cached_at)) => Ok(Some(StoredEntry {
        kind,
        payload,
        cached_at: parse_datetime(&cached_at)?,
      })),
      None => Ok(None),
    }
  }

  fn put(&self, key: &CacheKey, kind: &str, payload: &[u8]) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO cache_entries (key_hash, locator, kind, payload, cached_at)
         VALUES (?, ?, ?, ?, datetime('now'))",
        params![key.digest(), key.locator(), kind, payload],
      )
      .map_err(|e| eyre!("Failed to store cache entry {}: {}", key, e))?;

    Ok(())
  }

  fn delete(&self, key: &CacheKey) -> Result<bool> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let removed = conn
      .execute(
        "DELETE FROM cache_entries WHERE key_hash = ?",
        params![key.digest()],
      )
      .map_err(|e| eyre!("Failed to delete cache entry {}: {}", key, e))?;

    Ok(removed > 0)
  }

  fn keys(&self) -> Result<Vec<CacheKey>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT locator FROM cache_entries ORDER BY locator")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let keys = stmt
      .query_map([], |row| row.get::<_, String>(0))
      .map_err(|e| eyre!("Failed to list cache keys: {}", e))?
      .filter_map(|r| r.ok())
      .map(CacheKey::from_locator)
      .collect();

    Ok(keys)
  }

  fn clear(&self) -> Result<usize> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM cache_entries", [])
      .map_err(|e| eyre!("Failed to clear cache: {}", e))
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(locator: &str) -> CacheKey {
    CacheKey::from_locator(locator)
  }

  #[test]
  fn test_put_then_get_round_trips() {
    let storage = SqliteStorage::in_memory().unwrap();
    let k = key("https://proxy.example.edu/api/data");

    storage.put(&k, "attendance", b"{\"loggedIn\":true}").unwrap();
    let entry = storage.get(&k).unwrap().unwrap();

    assert_eq!(entry.kind, "attendance");
    assert_eq!(entry.payload, b"{\"loggedIn\":true}");
  }

  #[test]
  fn test_get_missing_returns_none() {
    let storage = SqliteStorage::in_memory().unwrap();
    assert!(storage.get(&key("nope")).unwrap().is_none());
  }

  #[test]
  fn test_put_overwrites_slot() {
    let storage = SqliteStorage::in_memory().unwrap();
    let k = key("a");

    storage.put(&k, "attendance", b"one").unwrap();
    storage.put(&k, "attendance", b"two").unwrap();

    assert_eq!(storage.get(&k).unwrap().unwrap().payload, b"two");
    assert_eq!(storage.keys().unwrap().len(), 1);
  }

  #[test]
  fn test_delete_and_keys() {
    let storage = SqliteStorage::in_memory().unwrap();
    storage.put(&key("b"), "static", b"x").unwrap();
    storage.put(&key("a"), "static", b"y").unwrap();

    assert_eq!(storage.keys().unwrap(), vec![key("a"), key("b")]);
    assert!(storage.delete(&key("a")).unwrap());
    assert!(!storage.delete(&key("a")).unwrap());
    assert_eq!(storage.keys().unwrap(), vec![key("b")]);
  }

  #[test]
  fn test_clear_removes_everything() {
    let storage = SqliteStorage::in_memory().unwrap();
    storage.put(&key("a"), "static", b"x").unwrap();
    storage.put(&key("b"), "static", b"y").unwrap();

    assert_eq!(storage.clear().unwrap(), 2);
    assert!(storage.keys().unwrap().is_empty());
  }

  #[test]
  fn test_noop_storage_always_misses() {
    let storage = NoopStorage;
    let k = key("a");
    storage.put(&k, "attendance", b"x").unwrap();
    assert!(storage.get(&k).unwrap().is_none());
    assert_eq!(storage.clear().unwrap(), 0);
  }
}
