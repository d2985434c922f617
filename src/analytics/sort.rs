use std::cmp::Reverse;

use crate::portal::types::AttendanceRecord;

use super::date::parse_date;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
  #[default]
  Newest,
  Oldest,
}

impl SortOrder {
  pub fn toggle(self) -> Self {
    match self {
      SortOrder::Newest => SortOrder::Oldest,
      SortOrder::Oldest => SortOrder::Newest,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      SortOrder::Newest => "newest first",
      SortOrder::Oldest => "oldest first",
    }
  }
}

/// Stable sort by date. Undated records count as infinitely old: last when
/// sorting newest first, first when sorting oldest first.
pub fn sort_by_date(mut records: Vec<AttendanceRecord>, order: SortOrder) -> Vec<AttendanceRecord> {
  // `None` orders before every date
  match order {
    SortOrder::Oldest => records.sort_by_cached_key(|r| parse_date(&r.date)),
    SortOrder::Newest => records.sort_by_cached_key(|r| Reverse(parse_date(&r.date))),
  }
  records
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::analytics::fixtures::record;

  fn dates(records: &[AttendanceRecord]) -> Vec<&str> {
    records.iter().map(|r| r.date.as_str()).collect()
  }

  fn sample() -> Vec<AttendanceRecord> {
    vec![
      record("A", "02/01/2025", "present"),
      record("B", "garbage", "present"),
      record("C", "10/01/2025", "present"),
      record("D", "01/01/2025", "present"),
    ]
  }

  #[test]
  fn test_newest_first_puts_undated_last() {
    let sorted = sort_by_date(sample(), SortOrder::Newest);
    assert_eq!(
      dates(&sorted),
      vec!["10/01/2025", "02/01/2025", "01/01/2025", "garbage"]
    );
  }

  #[test]
  fn test_oldest_first_puts_undated_first() {
    let sorted = sort_by_date(sample(), SortOrder::Oldest);
    assert_eq!(
      dates(&sorted),
      vec!["garbage", "01/01/2025", "02/01/2025", "10/01/2025"]
    );
  }

  #[test]
  fn test_sort_is_stable_for_equal_dates() {
    let records = vec![
      record("First", "05/01/2025", "present"),
      record("Early", "01/01/2025", "present"),
      record("Second", "05/01/2025", "absent"),
    ];

    let newest = sort_by_date(records.clone(), SortOrder::Newest);
    let subjects: Vec<_> = newest.iter().map(|r| r.subject.as_str()).collect();
    assert_eq!(subjects, vec!["First", "Second", "Early"]);

    let oldest = sort_by_date(records, SortOrder::Oldest);
    let subjects: Vec<_> = oldest.iter().map(|r| r.subject.as_str()).collect();
    assert_eq!(subjects, vec!["Early", "First", "Second"]);
  }

  #[test]
  fn test_toggle() {
    assert_eq!(SortOrder::Newest.toggle(), SortOrder::Oldest);
    assert_eq!(SortOrder::Oldest.toggle(), SortOrder::Newest);
  }
}
