//! Skip Eligibility Resolver
//!
//! Decides whether today's open obligation may be marked as intentionally
//! skipped. Only the current open period is ever eligible; closed periods are
//! history. Rules are checked in order and the first match wins.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::compliance::{is_satisfied, LogTimeline};
use crate::periods::{todays_periods, CompliancePeriod, PeriodKey, PeriodOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipDisabledReason {
  NoTrainingToday,
  AlreadyLogged,
  AlreadySkipped,
}

impl SkipDisabledReason {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::NoTrainingToday => "no training scheduled today",
      Self::AlreadyLogged => "already logged today",
      Self::AlreadySkipped => "already skipped this period",
    }
  }
}

impl std::fmt::Display for SkipDisabledReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl Serialize for SkipDisabledReason {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_str(self.as_str())
  }
}

/// Result of `computeTodaySkipStatus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipStatus {
  pub can_skip_today: bool,
  pub skip_disabled_reason: Option<SkipDisabledReason>,
  /// Keys a skip would be recorded under; empty unless skipping is allowed
  #[serde(skip)]
  pub skippable: Vec<PeriodKey>,
}

impl SkipStatus {
  pub fn allowed(skippable: Vec<PeriodKey>) -> Self {
    Self {
      can_skip_today: true,
      skip_disabled_reason: None,
      skippable,
    }
  }

  pub fn denied(reason: SkipDisabledReason) -> Self {
    Self {
      can_skip_today: false,
      skip_disabled_reason: Some(reason),
      skippable: Vec::new(),
    }
  }
}

/// Apply the decision table to today's open periods.
///
/// `periods` is the merged sequence for the whole schedule; an empty slice
/// covers both "no schedule" and "nothing generated yet".
pub fn resolve_skip_status(
  has_schedule: bool,
  periods: &[CompliancePeriod],
  timeline: &LogTimeline,
  skipped: &HashSet<PeriodKey>,
  now: DateTime<Utc>,
  options: &PeriodOptions,
) -> SkipStatus {
  if !has_schedule {
    return SkipStatus::denied(SkipDisabledReason::NoTrainingToday);
  }

  let today = todays_periods(periods, now, options);
  if today.is_empty() {
    return SkipStatus::denied(SkipDisabledReason::NoTrainingToday);
  }

  if today.iter().any(|p| is_satisfied(p, timeline)) {
    return SkipStatus::denied(SkipDisabledReason::AlreadyLogged);
  }

  let pending: Vec<PeriodKey> = today
    .iter()
    .map(|p| p.key())
    .filter(|key| !skipped.contains(key))
    .collect();
  if pending.is_empty() {
    return SkipStatus::denied(SkipDisabledReason::AlreadySkipped);
  }

  SkipStatus::allowed(pending)
}
