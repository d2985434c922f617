use crate::portal::types::AttendanceRecord;

/// Survey questions the portal appends to the bottom of the attendance table.
pub const FEEDBACK_LABELS: [&str; 10] = [
  "Objectives of the sessions were achieved.",
  "Learning experiences were relevant to the objectives.",
  "Sessions were relevant to my educational needs.",
  "The facilitator demonstrated command over subject matter.",
  "Time management of the sessions by the facilitator was appropriate.",
  "Reading material provided was relevant to the session.",
  "Tasks (individual and group) were relevant and appropriate.",
  "Opportunities for interaction were provided.",
  "Queries were clarified",
  "Key points were summarized at the end.",
];

/// Drop the trailing run of survey rows.
///
/// Only removes anything when the last `labels.len()` subjects equal `labels`
/// exactly and in order; otherwise `records` comes back unchanged.
pub fn strip_trailing_feedback_rows<S: AsRef<str>>(
  mut records: Vec<AttendanceRecord>,
  labels: &[S],
) -> Vec<AttendanceRecord> {
  if labels.is_empty() || records.len() < labels.len() {
    return records;
  }

  let tail_start = records.len() - labels.len();
  let matches = records[tail_start..]
    .iter()
    .zip(labels)
    .all(|(record, label)| record.subject == label.as_ref());

  if matches {
    records.truncate(tail_start);
  }
  records
}
