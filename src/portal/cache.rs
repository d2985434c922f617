//! Caching implementations for portal types.

use crate::cache::Cacheable;

use super::types::AttendanceSnapshot;

impl Cacheable for AttendanceSnapshot {
  fn resource_kind() -> &'static str {
    "attendance"
  }

  /// A logged-out response must never replace a real snapshot.
  fn is_storable(&self) -> bool {
    self.logged_in
  }
}
