use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

use crate::portal::types::AttendanceRecord;

use super::date::parse_date;
use super::stats::{compute_stats, Stats};

/// Overall outcome of one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
  Present,
  Absent,
  /// Both present and absent classes
  Mixed,
  /// Every class was on leave
  LeaveOnly,
  NoClasses,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayAttendance {
  pub date: NaiveDate,
  pub records: Vec<AttendanceRecord>,
  pub stats: Stats,
  pub status: DayStatus,
}

/// Month grid, weeks starting on Sunday. Cells outside the month are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthCalendar {
  pub year: i32,
  pub month: u32,
  pub weeks: Vec<[Option<DayAttendance>; 7]>,
}

fn day_status(stats: &Stats) -> DayStatus {
  if stats.total == 0 {
    DayStatus::NoClasses
  } else if stats.leave == stats.total {
    DayStatus::LeaveOnly
  } else if stats.present > 0 && stats.absent > 0 {
    DayStatus::Mixed
  } else if stats.present > 0 {
    DayStatus::Present
  } else if stats.absent > 0 {
    DayStatus::Absent
  } else {
    DayStatus::NoClasses
  }
}

/// Build the calendar for `month` (1-12) of `year`. Returns `None` for an
/// invalid month.
pub fn month_calendar(records: &[AttendanceRecord], year: i32, month: u32) -> Option<MonthCalendar> {
  let first = NaiveDate::from_ymd_opt(year, month, 1)?;
  let next_month = if month == 12 {
    NaiveDate::from_ymd_opt(year + 1, 1, 1)?
  } else {
    NaiveDate::from_ymd_opt(year, month + 1, 1)?
  };

  let mut by_day: BTreeMap<u32, Vec<AttendanceRecord>> = BTreeMap::new();
  for record in records {
    if let Some(date) = parse_date(&record.date) {
      if date.year() == year && date.month() == month {
        by_day.entry(date.day()).or_default().push(record.clone());
      }
    }
  }

  let mut weeks = Vec::new();
  let mut week: [Option<DayAttendance>; 7] = Default::default();
  let mut slot = first.weekday().num_days_from_sunday() as usize;

  for date in first.iter_days().take_while(|d| *d < next_month) {
    let records = by_day.remove(&date.day()).unwrap_or_default();
    let stats = compute_stats(&records);
    week[slot] = Some(DayAttendance {
      date,
      status: day_status(&stats),
      stats,
      records,
    });

    slot += 1;
    if slot == 7 {
      weeks.push(std::mem::take(&mut week));
      slot = 0;
    }
  }

  if slot > 0 {
    weeks.push(week);
  }

  Some(MonthCalendar { year, month, weeks })
}
