//! Compliance Evaluator
//!
//! A period is satisfied when at least one of the user's logs falls inside
//! `[window_start, window_end]`, both ends inclusive. The timeline is built
//! from a single range read per request and is never cached across requests,
//! so edits and deletes show up immediately.

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::LogEntry;
use crate::periods::{CompliancePeriod, PeriodOptions};

/// Sorted log timestamps for one user.
#[derive(Debug, Clone, Default)]
pub struct LogTimeline {
  timestamps: Vec<DateTime<Utc>>,
}

impl LogTimeline {
  pub fn new(mut timestamps: Vec<DateTime<Utc>>) -> Self {
    timestamps.sort_unstable();
    Self { timestamps }
  }

  pub fn from_entries(entries: &[LogEntry]) -> Self {
    Self::new(entries.iter().map(|e| e.timestamp).collect())
  }

  pub fn len(&self) -> usize {
    self.timestamps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.timestamps.is_empty()
  }

  /// Number of logs inside `[start, end]`.
  pub fn count_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> usize {
    if end < start {
      return 0;
    }
    let lo = self.timestamps.partition_point(|t| *t < start);
    let hi = self.timestamps.partition_point(|t| *t <= end);
    hi - lo
  }

  pub fn any_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    self.count_between(start, end) > 0
  }

  /// Local calendar dates carrying at least one log, newest first.
  pub fn logged_dates(&self, options: &PeriodOptions) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = self
      .timestamps
      .iter()
      .map(|t| options.local_date(*t))
      .collect();
    dates.dedup();
    dates.reverse();
    dates
  }
}

pub fn is_satisfied(period: &CompliancePeriod, timeline: &LogTimeline) -> bool {
  timeline.any_between(period.window_start, period.window_end)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::SlotInput;
  use crate::periods::{slot_periods, Horizon};
  use crate::schedule::Schedule;
  use crate::test_utils::utc;
  use chrono::Duration;

  fn monday_period(now: DateTime<Utc>) -> CompliancePeriod {
    let schedule = Schedule::from_inputs(&[SlotInput::new(1, "09:00")]).unwrap();
    let options = PeriodOptions {
      horizon: Horizon { weeks: 1, since: None },
      ..PeriodOptions::default()
    };
    slot_periods(&schedule.slots()[0], now, &options).remove(0)
  }

  #[test]
  fn test_log_at_window_end_counts() {
    let period = monday_period(utc(2026, 10, 13, 12, 0));

    let at_end = LogTimeline::new(vec![period.window_end]);
    assert!(is_satisfied(&period, &at_end));

    let after_end = LogTimeline::new(vec![period.window_end + Duration::microseconds(1)]);
    assert!(!is_satisfied(&period, &after_end));
  }

  #[test]
  fn test_log_at_window_start_counts() {
    let period = monday_period(utc(2026, 10, 13, 12, 0));

    let at_start = LogTimeline::new(vec![period.window_start]);
    assert!(is_satisfied(&period, &at_start));

    let before_start = LogTimeline::new(vec![period.window_start - Duration::microseconds(1)]);
    assert!(!is_satisfied(&period, &before_start));
  }

  #[test]
  fn test_empty_timeline_satisfies_nothing() {
    let period = monday_period(utc(2026, 10, 13, 12, 0));
    let timeline = LogTimeline::default();
    assert!(timeline.is_empty());
    assert!(!is_satisfied(&period, &timeline));
  }

  #[test]
  fn test_count_between_unsorted_input() {
    let timeline = LogTimeline::new(vec![
      utc(2026, 10, 14, 8, 0),
      utc(2026, 10, 12, 8, 0),
      utc(2026, 10, 20, 8, 0),
      utc(2026, 10, 12, 18, 0),
    ]);

    assert_eq!(timeline.len(), 4);
    assert_eq!(
      timeline.count_between(utc(2026, 10, 12, 0, 0), utc(2026, 10, 14, 8, 0)),
      3
    );
    assert_eq!(
      timeline.count_between(utc(2026, 10, 14, 8, 0), utc(2026, 10, 12, 0, 0)),
      0
    );
  }

  #[test]
  fn test_logged_dates_newest_first_and_distinct() {
    let timeline = LogTimeline::new(vec![
      utc(2026, 10, 12, 8, 0),
      utc(2026, 10, 12, 18, 0),
      utc(2026, 10, 14, 7, 0),
    ]);
    let dates: Vec<String> = timeline
      .logged_dates(&PeriodOptions::default())
      .iter()
      .map(|d| d.to_string())
      .collect();
    assert_eq!(dates, vec!["2026-10-14", "2026-10-12"]);
  }
}
