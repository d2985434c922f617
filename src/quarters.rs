//! Durable, user-edited quarter boundaries.
//!
//! Quarters live in a small JSON file next to the config. Every successful
//! save is broadcast on a watch channel so views re-derive their scope
//! without a reload.

use chrono::NaiveDate;
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::analytics::Quarter;

pub struct QuarterStore {
  path: PathBuf,
  tx: watch::Sender<Vec<Quarter>>,
  /// File modification time as of the last read or write
  modified: Option<SystemTime>,
}

impl QuarterStore {
  /// Load quarters from `path`. A missing file means no quarters; an
  /// unreadable one is logged and treated the same way.
  pub fn open(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let quarters = match read_quarters(&path) {
      Ok(q) => q,
      Err(e) => {
        warn!("Ignoring quarters file: {}", e);
        Vec::new()
      }
    };
    debug!("Loaded {} quarters from {}", quarters.len(), path.display());

    let (tx, _) = watch::channel(quarters);
    let modified = modified_at(&path);
    Self { path, tx, modified }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn quarters(&self) -> Vec<Quarter> {
    self.tx.borrow().clone()
  }

  /// Receiver that observes every saved quarter list.
  pub fn subscribe(&self) -> watch::Receiver<Vec<Quarter>> {
    self.tx.subscribe()
  }

  /// Re-read the file if something else wrote it since we last looked.
  /// Returns whether the quarter list changed.
  pub fn reload_if_modified(&mut self) -> bool {
    let modified = modified_at(&self.path);
    if modified == self.modified {
      return false;
    }
    self.modified = modified;

    let quarters = match read_quarters(&self.path) {
      Ok(q) => q,
      Err(e) => {
        warn!("Ignoring quarters file: {}", e);
        return false;
      }
    };
    debug!("Quarters file changed on disk");
    self.tx.send_if_modified(|current| {
      if *current == quarters {
        return false;
      }
      *current = quarters;
      true
    })
  }

  /// Validate, persist and broadcast `quarters`.
  pub fn save(&mut self, quarters: Vec<Quarter>) -> Result<()> {
    validate(&quarters)?;

    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create {}: {}", parent.display(), e))?;
    }

    let json = serde_json::to_string_pretty(&quarters)
      .map_err(|e| eyre!("Failed to serialize quarters: {}", e))?;
    std::fs::write(&self.path, json)
      .map_err(|e| eyre!("Failed to write {}: {}", self.path.display(), e))?;

    info!("Saved {} quarters", quarters.len());
    self.modified = modified_at(&self.path);
    self.tx.send_replace(quarters);
    Ok(())
  }

  /// Append a quarter. Without an explicit start it begins the day after the
  /// previous quarter ends.
  pub fn add(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<()> {
    let mut quarters = self.quarters();
    let start = start.or_else(|| {
      quarters
        .last()
        .and_then(|q| q.end)
        .and_then(|end| end.succ_opt())
    });
    quarters.push(Quarter::new(start, end));
    self.save(quarters)
  }

  /// Remove the quarter at `index` (0-based).
  pub fn remove(&mut self, index: usize) -> Result<Quarter> {
    let mut quarters = self.quarters();
    if index >= quarters.len() {
      return Err(eyre!("No quarter {} (have {})", index + 1, quarters.len()));
    }
    let removed = quarters.remove(index);
    self.save(quarters)?;
    Ok(removed)
  }

  /// Change where a quarter ends. The following quarter, if any, is moved to
  /// start the next day.
  pub fn set_end(&mut self, index: usize, end: Option<NaiveDate>) -> Result<()> {
    let mut quarters = self.quarters();
    let quarter = quarters
      .get_mut(index)
      .ok_or_else(|| eyre!("No quarter {}", index + 1))?;
    quarter.end = end;

    if let Some(next) = quarters.get_mut(index + 1) {
      next.start = end.and_then(|d| d.succ_opt());
    }
    self.save(quarters)
  }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
  std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn read_quarters(path: &Path) -> Result<Vec<Quarter>> {
  if !path.exists() {
    return Ok(Vec::new());
  }
  let contents = std::fs::read_to_string(path)
    .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
  serde_json::from_str(&contents).map_err(|e| eyre!("Invalid {}: {}", path.display(), e))
}

/// Only the first quarter may start open and only the last may end open.
/// Gaps and overlaps between quarters are allowed.
pub fn validate(quarters: &[Quarter]) -> Result<()> {
  let last = quarters.len().saturating_sub(1);

  for (i, q) in quarters.iter().enumerate() {
    let n = i + 1;
    if q.end.is_none() && (quarters.len() == 1 || i < last) {
      return Err(eyre!("Quarter {} needs an end date", n));
    }
    if q.start.is_none() && i > 0 {
      return Err(eyre!("Quarter {} needs a start date", n));
    }
    if let (Some(start), Some(end)) = (q.start, q.end) {
      if start > end {
        return Err(eyre!("Quarter {} ends before it starts", n));
      }
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
  }

  fn temp_store(name: &str) -> QuarterStore {
    let dir = std::env::temp_dir().join(format!("attendr-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    QuarterStore::open(dir.join("quarters.json"))
  }

  #[test]
  fn test_missing_file_means_no_quarters() {
    let store = temp_store("missing");
    assert!(store.quarters().is_empty());
  }

  #[test]
  fn test_save_persists_and_reloads() {
    let mut store = temp_store("persist");
    let quarters = vec![
      Quarter::new(None, ymd(2025, 3, 31)),
      Quarter::new(ymd(2025, 4, 1), None),
    ];
    store.save(quarters.clone()).unwrap();

    let reopened = QuarterStore::open(store.path().to_path_buf());
    assert_eq!(reopened.quarters(), quarters);
  }

  #[test]
  fn test_corrupt_file_is_ignored() {
    let store = temp_store("corrupt");
    std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    std::fs::write(store.path(), "not json").unwrap();

    let reopened = QuarterStore::open(store.path().to_path_buf());
    assert!(reopened.quarters().is_empty());
  }

  #[test]
  fn test_save_broadcasts_change() {
    let mut store = temp_store("broadcast");
    let mut rx = store.subscribe();
    assert!(!rx.has_changed().unwrap());

    store.add(ymd(2025, 1, 1), ymd(2025, 3, 31)).unwrap();

    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().len(), 1);
  }

  #[test]
  fn test_add_starts_after_previous_end() {
    let mut store = temp_store("add");
    store.add(ymd(2025, 1, 1), ymd(2025, 3, 31)).unwrap();
    store.add(None, None).unwrap();

    assert_eq!(store.quarters()[1].start, ymd(2025, 4, 1));
  }

  #[test]
  fn test_set_end_moves_next_start() {
    let mut store = temp_store("set-end");
    store.add(None, ymd(2025, 3, 31)).unwrap();
    store.add(None, None).unwrap();

    store.set_end(0, ymd(2025, 4, 15)).unwrap();

    let quarters = store.quarters();
    assert_eq!(quarters[0].end, ymd(2025, 4, 15));
    assert_eq!(quarters[1].start, ymd(2025, 4, 16));
  }

  #[test]
  fn test_external_edit_is_picked_up() {
    let mut store = temp_store("external");
    let rx = store.subscribe();
    assert!(!store.reload_if_modified());

    let mut other = QuarterStore::open(store.path().to_path_buf());
    other.add(None, ymd(2025, 3, 31)).unwrap();

    assert!(store.reload_if_modified());
    assert!(rx.has_changed().unwrap());
    assert_eq!(store.quarters(), other.quarters());
  }

  #[test]
  fn test_remove() {
    let mut store = temp_store("remove");
    store.add(None, ymd(2025, 3, 31)).unwrap();
    store.add(None, None).unwrap();

    let removed = store.remove(1).unwrap();
    assert_eq!(removed.start, ymd(2025, 4, 1));
    assert_eq!(store.quarters().len(), 1);
    assert!(store.remove(5).is_err());
  }

  #[test]
  fn test_rejected_save_keeps_previous_quarters() {
    let mut store = temp_store("rejected");
    store.add(None, ymd(2025, 3, 31)).unwrap();

    // Single open-ended quarter is not allowed
    assert!(store.save(vec![Quarter::new(ymd(2025, 1, 1), None)]).is_err());
    assert_eq!(store.quarters().len(), 1);
    assert_eq!(store.quarters()[0].end, ymd(2025, 3, 31));
  }

  #[test]
  fn test_validation_rules() {
    assert!(validate(&[]).is_ok());
    assert!(validate(&[Quarter::new(None, ymd(2025, 3, 31))]).is_ok());
    assert!(validate(&[Quarter::new(None, None)]).is_err());

    // Only the last may end open
    assert!(validate(&[
      Quarter::new(None, None),
      Quarter::new(ymd(2025, 4, 1), ymd(2025, 6, 30)),
    ])
    .is_err());

    // Only the first may start open
    assert!(validate(&[
      Quarter::new(None, ymd(2025, 3, 31)),
      Quarter::new(None, None),
    ])
    .is_err());

    assert!(validate(&[Quarter::new(ymd(2025, 5, 1), ymd(2025, 4, 1))]).is_err());

    // Overlaps are tolerated
    assert!(validate(&[
      Quarter::new(None, ymd(2025, 3, 31)),
      Quarter::new(ymd(2025, 3, 1), None),
    ])
    .is_ok());
  }
}
