//! Failure taxonomy shared by the cache layer and the sync coordinator.
//!
//! A lapsed portal session is not an error: it travels as
//! `AttendanceSnapshot { logged_in: false, .. }`.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
  /// Transport failure or non-success HTTP status from the portal.
  #[error("Network request failed: {0}")]
  Network(String),

  /// The platform offers no persistent cache; we run network-only.
  #[error("Cache unavailable: {0}")]
  CacheUnavailable(String),

  /// A cache write failed (disk full, read-only database, ...).
  #[error("Cache write failed: {0}")]
  CacheWrite(String),

  /// A single attendance row could not be parsed.
  #[error("Malformed attendance row {index}: {reason}")]
  MalformedRow { index: usize, reason: String },
}

impl SyncError {
  /// Whether retrying the same operation can reasonably succeed.
  pub fn is_retryable(&self) -> bool {
    matches!(self, SyncError::Network(_))
  }
}

impl From<reqwest::Error> for SyncError {
  fn from(e: reqwest::Error) -> Self {
    match e.status() {
      Some(status) => SyncError::Network(format!("portal returned HTTP {}", status.as_u16())),
      None => SyncError::Network(e.to_string()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_only_network_is_retryable() {
    assert!(SyncError::Network("timeout".into()).is_retryable());
    assert!(!SyncError::CacheWrite("disk full".into()).is_retryable());
    assert!(!SyncError::CacheUnavailable("no db".into()).is_retryable());
  }

  #[test]
  fn test_malformed_row_message() {
    let err = SyncError::MalformedRow {
      index: 3,
      reason: "missing subject".into(),
    };
    assert_eq!(err.to_string(), "Malformed attendance row 3: missing subject");
  }
}
