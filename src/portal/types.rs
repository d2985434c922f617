use serde::{Deserialize, Serialize};
use std::fmt;

/// Attendance status of a single lecture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
  Present,
  Absent,
  Leave,
  /// Anything the portal sends that is not one of the three above.
  /// Counts toward the total but toward none of the buckets.
  Unrecognized(String),
}

impl Status {
  /// Parse a status string case-insensitively. Never fails.
  pub fn parse(raw: &str) -> Self {
    let trimmed = raw.trim();
    match trimmed.to_lowercase().as_str() {
      "present" => Status::Present,
      "absent" => Status::Absent,
      "leave" => Status::Leave,
      _ => Status::Unrecognized(trimmed.to_string()),
    }
  }

  pub fn label(&self) -> &str {
    match self {
      Status::Present => "present",
      Status::Absent => "absent",
      Status::Leave => "leave",
      Status::Unrecognized(raw) => raw,
    }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// One lecture or lab entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub subject: String,
  pub lecture_type: String,
  pub teacher: String,
  pub lecture_time: String,
  /// `DD/MM/YYYY` as delivered by the portal
  pub date: String,
  pub status: Status,
}

/// Everything one sync produces. Replaced wholesale, never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSnapshot {
  pub logged_in: bool,
  pub records: Vec<AttendanceRecord>,
}

impl AttendanceSnapshot {
  pub fn logged_out() -> Self {
    Self::default()
  }
}
