//! Streak Engine
//!
//! Walks the merged, time-descending period sequence from the most recent
//! closed period backwards:
//! - satisfied periods extend the streak
//! - unsatisfied periods that were validly skipped pass through without counting
//! - the first unsatisfied, unskipped period ends the walk
//!
//! Open periods neither extend nor break the streak until they close.

use std::collections::HashSet;

use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};

use crate::compliance::{is_satisfied, LogTimeline};
use crate::periods::{CompliancePeriod, PeriodKey, PeriodOptions};

// ---------------------------------------------------------------------------
/// No-schedule policy: what a streak means without any slot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoSchedulePolicy {
  /// Compliance cannot be asserted without a schedule
  #[default]
  Zero,
  /// Consecutive local days with at least one log
  DailyLogging,
}

impl std::fmt::Display for NoSchedulePolicy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Zero => write!(f, "zero"),
      Self::DailyLogging => write!(f, "daily_logging"),
    }
  }
}

impl std::str::FromStr for NoSchedulePolicy {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "zero" => Ok(Self::Zero),
      "daily_logging" => Ok(Self::DailyLogging),
      _ => Err(format!("Unknown no-schedule policy: {}", s)),
    }
  }
}

/// Result of `computeStreak`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StreakSummary {
  pub streak: u32,
}

/// Details of one backward walk, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreakWalk {
  pub streak: u32,
  pub skipped_passes: u32,
  pub broken_at: Option<PeriodKey>,
}

impl From<&StreakWalk> for StreakSummary {
  fn from(walk: &StreakWalk) -> Self {
    Self { streak: walk.streak }
  }
}

/// Walk `periods` (merged, newest first) and count the streak.
pub fn walk_streak(
  periods: &[CompliancePeriod],
  timeline: &LogTimeline,
  skipped: &HashSet<PeriodKey>,
) -> StreakWalk {
  let mut walk = StreakWalk::default();

  for period in periods.iter().filter(|p| p.is_closed()) {
    if is_satisfied(period, timeline) {
      walk.streak += 1;
      continue;
    }

    let key = period.key();
    if skipped.contains(&key) {
      walk.skipped_passes += 1;
      continue;
    }

    walk.broken_at = Some(key);
    break;
  }

  walk
}

pub fn count_streak(
  periods: &[CompliancePeriod],
  timeline: &LogTimeline,
  skipped: &HashSet<PeriodKey>,
) -> u32 {
  walk_streak(periods, timeline, skipped).streak
}

/// Consecutive logged local days ending today, or ending yesterday when today
/// has no log yet.
pub fn daily_logging_streak(
  timeline: &LogTimeline,
  now: DateTime<Utc>,
  options: &PeriodOptions,
) -> u32 {
  let today = options.local_date(now);
  let dates = timeline.logged_dates(options);
  let mut dates = dates.into_iter().filter(|d| *d <= today).peekable();

  let mut expected = match dates.peek() {
    Some(first) if *first == today => today,
    Some(_) => match today.checked_sub_days(Days::new(1)) {
      Some(yesterday) => yesterday,
      None => return 0,
    },
    None => return 0,
  };

  let mut streak = 0;
  for date in dates {
    if date != expected {
      break;
    }
    streak += 1;
    match expected.checked_sub_days(Days::new(1)) {
      Some(previous) => expected = previous,
      None => break,
    }
  }

  streak
}
