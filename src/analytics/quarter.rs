use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::portal::types::AttendanceRecord;

use super::date::parse_date;
use super::stats::compute_stats;

/// A user-defined date range. A missing bound is open-ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quarter {
  #[serde(default, deserialize_with = "empty_as_none")]
  pub start: Option<NaiveDate>,
  #[serde(default, deserialize_with = "empty_as_none")]
  pub end: Option<NaiveDate>,
}

/// Older quarter files store open bounds as `""`.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw: Option<String> = Option::deserialize(deserializer)?;
  match raw.as_deref().map(str::trim) {
    None | Some("") => Ok(None),
    Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
      .map(Some)
      .map_err(serde::de::Error::custom),
  }
}

impl Quarter {
  pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
    Self { start, end }
  }

  /// Whether `date` falls in `[start, end]`, the end day included in full.
  pub fn contains(&self, date: NaiveDate) -> bool {
    if let Some(start) = self.start {
      if date < start {
        return false;
      }
    }

    if let Some(end) = self.end {
      // Exclusive bound at the start of the following day
      if let Some(after_end) = end.succ_opt() {
        if date >= after_end {
          return false;
        }
      }
    }

    true
  }
}

impl fmt::Display for Quarter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let bound = |d: Option<NaiveDate>| d.map(|d| d.format("%d/%m/%Y").to_string());
    write!(
      f,
      "{} - {}",
      bound(self.start).unwrap_or_else(|| "beginning".to_string()),
      bound(self.end).unwrap_or_else(|| "now".to_string())
    )
  }
}

/// Records whose date falls inside `quarter`. Undated records never match.
pub fn filter_by_quarter(records: &[AttendanceRecord], quarter: &Quarter) -> Vec<AttendanceRecord> {
  records
    .iter()
    .filter(|r| parse_date(&r.date).is_some_and(|d| quarter.contains(d)))
    .cloned()
    .collect()
}

/// Attendance percentage of each quarter, in quarter order.
pub fn quarter_percentages(records: &[AttendanceRecord], quarters: &[Quarter]) -> Vec<String> {
  quarters
    .iter()
    .map(|q| compute_stats(&filter_by_quarter(records, q)).percentage)
    .collect()
}
