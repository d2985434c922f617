use std::collections::HashMap;

use crate::portal::types::{AttendanceRecord, Status};

/// Aggregate counts for a set of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
  pub total: usize,
  pub present: usize,
  pub absent: usize,
  pub leave: usize,
  /// Records whose status was none of the three known values
  pub unrecognized: usize,
  /// `present / (total - leave) * 100`, two decimals
  pub percentage: String,
}

impl Stats {
  /// Classes that count toward the percentage (leaves excluded).
  pub fn counted(&self) -> usize {
    self.total.saturating_sub(self.leave)
  }

  pub fn percent_value(&self) -> f64 {
    self.percentage.parse().unwrap_or(0.0)
  }
}

/// Per-subject statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectSummary {
  pub subject: String,
  pub stats: Stats,
}

/// Format `numerator / denominator * 100` with two decimals, `"0.00"` for an
/// empty denominator.
pub fn format_percentage(numerator: usize, denominator: usize) -> String {
  if denominator == 0 {
    return "0.00".to_string();
  }
  format!("{:.2}", numerator as f64 / denominator as f64 * 100.0)
}

pub fn compute_stats<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> Stats {
  let (mut total, mut present, mut absent, mut leave, mut unrecognized) = (0, 0, 0, 0, 0);

  for record in records {
    total += 1;
    match record.status {
      Status::Present => present += 1,
      Status::Absent => absent += 1,
      Status::Leave => leave += 1,
      Status::Unrecognized(_) => unrecognized += 1,
    }
  }

  Stats {
    total,
    present,
    absent,
    leave,
    unrecognized,
    percentage: format_percentage(present, total - leave),
  }
}

/// Group records by subject, subjects in order of first appearance.
pub fn group_by_subject(records: &[AttendanceRecord]) -> Vec<(&str, Vec<&AttendanceRecord>)> {
  let mut index: HashMap<&str, usize> = HashMap::new();
  let mut groups: Vec<(&str, Vec<&AttendanceRecord>)> = Vec::new();

  for record in records {
    let subject = record.subject.as_str();
    match index.get(subject) {
      Some(&i) => groups[i].1.push(record),
      None => {
        index.insert(subject, groups.len());
        groups.push((subject, vec![record]));
      }
    }
  }

  groups
}

pub fn subject_summaries(records: &[AttendanceRecord]) -> Vec<SubjectSummary> {
  group_by_subject(records)
    .into_iter()
    .map(|(subject, group)| SubjectSummary {
      subject: subject.to_string(),
      stats: compute_stats(group),
    })
    .collect()
}

/// Distinct subjects in order of first appearance.
pub fn subjects(records: &[AttendanceRecord]) -> Vec<String> {
  group_by_subject(records)
    .into_iter()
    .map(|(subject, _)| subject.to_string())
    .collect()
}

pub fn filter_by_subject(records: &[AttendanceRecord], subject: &str) -> Vec<AttendanceRecord> {
  records
    .iter()
    .filter(|r| r.subject == subject)
    .cloned()
    .collect()
}
