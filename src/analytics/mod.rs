//! Attendance analytics.
//!
//! Pure functions over a record sequence and the user's quarters: grouping,
//! aggregate statistics, quarter scoping, date ordering, calendar views and
//! the safe-absence projection. No I/O and no hidden state.

mod bunk;
mod calendar;
mod date;
mod feedback;
mod quarter;
mod sort;
mod stats;

pub use bunk::{safe_bunk_calculator, BunkProjection};
pub use calendar::{month_calendar, DayStatus, MonthCalendar};
pub use date::parse_date;
pub use feedback::{strip_trailing_feedback_rows, FEEDBACK_LABELS};
pub use quarter::{filter_by_quarter, quarter_percentages, Quarter};
pub use sort::{sort_by_date, SortOrder};
pub use stats::{
  compute_stats, filter_by_subject, subject_summaries, subjects, Stats,
  SubjectSummary,
};

#[cfg(test)]
pub(crate) mod fixtures {
  use crate::portal::types::{AttendanceRecord, Status};

  pub fn record(subject: &str, date: &str, status: &str) -> AttendanceRecord {
    AttendanceRecord {
      subject: subject.to_string(),
      lecture_type: "Lecture".to_string(),
      teacher: "Dr. Rana".to_string(),
      lecture_time: "08:00 - 09:00".to_string(),
      date: date.to_string(),
      status: Status::parse(status),
    }
  }

  /// One record per status, dated consecutively from 1 Feb 2025.
  pub fn records_with(subject: &str, statuses: &[&str]) -> Vec<AttendanceRecord> {
    statuses
      .iter()
      .enumerate()
      .map(|(i, status)| record(subject, &format!("{:02}/02/2025", i % 28 + 1), status))
      .collect()
  }
}
