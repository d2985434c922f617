//! Serde-deserializable types matching the attendance proxy's JSON.
//!
//! Rows are kept as raw `serde_json::Value`s until conversion so that one
//! malformed row can be skipped without rejecting the whole response.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::SyncError;

use super::types::{AttendanceRecord, AttendanceSnapshot, Status};

/// Response body of the proxy's data endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiAttendanceResponse {
  #[serde(rename = "loggedIn", default)]
  pub logged_in: bool,
  #[serde(default)]
  pub attendance: Vec<Value>,
}

/// A single table row as scraped by the proxy.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAttendanceRow {
  pub subject: String,
  #[serde(default)]
  pub lecture_type: String,
  #[serde(default)]
  pub teacher: String,
  #[serde(default)]
  pub lecture_time: String,
  pub date: String,
  pub status: String,
}

impl ApiAttendanceRow {
  pub fn into_record(self) -> AttendanceRecord {
    AttendanceRecord {
      subject: self.subject.trim().to_string(),
      lecture_type: self.lecture_type.trim().to_string(),
      teacher: self.teacher.trim().to_string(),
      lecture_time: self.lecture_time.trim().to_string(),
      date: self.date.trim().to_string(),
      status: Status::parse(&self.status),
    }
  }
}

/// Parse one raw row, reporting why it was rejected.
pub fn parse_row(index: usize, value: Value) -> Result<AttendanceRecord, SyncError> {
  let row: ApiAttendanceRow = serde_json::from_value(value).map_err(|e| SyncError::MalformedRow {
    index,
    reason: e.to_string(),
  })?;
  Ok(row.into_record())
}

impl ApiAttendanceResponse {
  /// Convert into a snapshot, skipping rows that do not parse.
  pub fn into_snapshot(self) -> AttendanceSnapshot {
    if !self.logged_in {
      return AttendanceSnapshot::logged_out();
    }

    let records = self
      .attendance
      .into_iter()
      .enumerate()
      .filter_map(|(index, value)| match parse_row(index, value) {
        Ok(record) => Some(record),
        Err(e) => {
          warn!("Skipping row: {}", e);
          None
        }
      })
      .collect();

    AttendanceSnapshot {
      logged_in: true,
      records,
    }
  }
}
