//! Streak and skip-status service
//!
//! Wires the pure pieces together for one request: validate the schedule,
//! derive periods for a single `now`, read the covering log range and the skip
//! markers once, then evaluate. Nothing is retained between calls.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::compliance::LogTimeline;
use crate::models::SlotInput;
use crate::periods::{
  covering_range, merged_periods, CompliancePeriod, PeriodKey, PeriodOptions, MAX_HORIZON_WEEKS,
};
use crate::schedule::{Schedule, ScheduleError};
use crate::skip::{resolve_skip_status, SkipStatus};
use crate::store::{StoreError, TrainingStore};
use crate::streak::{daily_logging_streak, walk_streak, NoSchedulePolicy, StreakSummary};

// ---------------------------------------------------------------------------
/// Error Handling
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  #[error("Invalid schedule: {0}")]
  Schedule(#[from] ScheduleError),

  #[error(transparent)]
  Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
/// Engine Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineOptions {
  pub periods: PeriodOptions,
  pub no_schedule: NoSchedulePolicy,
}

/// Everything one evaluation needs, read once for a single `now`.
struct Snapshot {
  schedule: Schedule,
  periods: Vec<CompliancePeriod>,
  timeline: LogTimeline,
  skipped: HashSet<PeriodKey>,
  now: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
/// Service
// ---------------------------------------------------------------------------

pub struct StreakService<'a, S: TrainingStore + ?Sized> {
  store: &'a S,
  clock: &'a dyn Clock,
  options: EngineOptions,
}

impl<'a, S: TrainingStore + ?Sized> StreakService<'a, S> {
  pub fn new(store: &'a S, clock: &'a dyn Clock, options: EngineOptions) -> Self {
    Self {
      store,
      clock,
      options,
    }
  }

  /// `computeStreak(userId, slots)`
  pub async fn compute_streak(
    &self,
    user_id: &str,
    slots: &[SlotInput],
  ) -> Result<StreakSummary, EngineError> {
    let schedule = Schedule::from_inputs(slots)?;
    let snapshot = self.snapshot(user_id, schedule, self.clock.now()).await?;
    self.streak(user_id, &snapshot).await
  }

  /// `computeTodaySkipStatus(userId, slots)`
  pub async fn compute_today_skip_status(
    &self,
    user_id: &str,
    slots: &[SlotInput],
  ) -> Result<SkipStatus, EngineError> {
    let schedule = Schedule::from_inputs(slots)?;
    let snapshot = self.snapshot(user_id, schedule, self.clock.now()).await?;
    Ok(self.skip_status(user_id, &snapshot))
  }

  /// Streak and skip status from one snapshot, both against the same `now`.
  pub async fn evaluate(
    &self,
    user_id: &str,
    slots: &[SlotInput],
  ) -> Result<(StreakSummary, SkipStatus), EngineError> {
    let schedule = Schedule::from_inputs(slots)?;
    let snapshot = self.snapshot(user_id, schedule, self.clock.now()).await?;
    let summary = self.streak(user_id, &snapshot).await?;
    Ok((summary, self.skip_status(user_id, &snapshot)))
  }

  pub async fn streak_for_user(&self, user_id: &str) -> Result<StreakSummary, EngineError> {
    let slots = self.store.fetch_user_training_slots(user_id).await?;
    self.compute_streak(user_id, &slots).await
  }

  pub async fn skip_status_for_user(&self, user_id: &str) -> Result<SkipStatus, EngineError> {
    let slots = self.store.fetch_user_training_slots(user_id).await?;
    self.compute_today_skip_status(user_id, &slots).await
  }

  /// Today's open periods that a skip would be recorded for, with their start.
  pub async fn skippable_periods(
    &self,
    user_id: &str,
    slots: &[SlotInput],
  ) -> Result<(SkipStatus, Vec<(PeriodKey, DateTime<Utc>)>), EngineError> {
    let schedule = Schedule::from_inputs(slots)?;
    let snapshot = self.snapshot(user_id, schedule, self.clock.now()).await?;
    let status = self.skip_status(user_id, &snapshot);

    let targets = snapshot
      .periods
      .iter()
      .filter(|p| status.skippable.contains(&p.key()))
      .map(|p| (p.key(), p.window_start))
      .collect();

    Ok((status, targets))
  }

  async fn snapshot(
    &self,
    user_id: &str,
    schedule: Schedule,
    now: DateTime<Utc>,
  ) -> Result<Snapshot, EngineError> {
    let periods = merged_periods(&schedule, now, &self.options.periods);

    let (timeline, skipped) = match covering_range(&periods) {
      Some((start, end)) => {
        let logs = self.store.fetch_logs_in_range(user_id, start, end).await?;
        let skipped = self.store.fetch_skipped_periods(user_id, start).await?;
        (LogTimeline::from_entries(&logs), skipped)
      }
      None => (LogTimeline::default(), HashSet::new()),
    };

    Ok(Snapshot {
      schedule,
      periods,
      timeline,
      skipped,
      now,
    })
  }

  async fn streak(&self, user_id: &str, snapshot: &Snapshot) -> Result<StreakSummary, EngineError> {
    if snapshot.schedule.is_empty() {
      return self.no_schedule_streak(user_id, snapshot.now).await;
    }

    let walk = walk_streak(&snapshot.periods, &snapshot.timeline, &snapshot.skipped);

    log::debug!(
      "streak for {}: {} ({} skipped passes, broken at {:?})",
      user_id,
      walk.streak,
      walk.skipped_passes,
      walk.broken_at
    );

    Ok(StreakSummary::from(&walk))
  }

  fn skip_status(&self, user_id: &str, snapshot: &Snapshot) -> SkipStatus {
    let status = resolve_skip_status(
      !snapshot.schedule.is_empty(),
      &snapshot.periods,
      &snapshot.timeline,
      &snapshot.skipped,
      snapshot.now,
      &self.options.periods,
    );

    log::debug!(
      "skip status for {}: can_skip={} reason={:?}",
      user_id,
      status.can_skip_today,
      status.skip_disabled_reason
    );

    status
  }

  async fn no_schedule_streak(
    &self,
    user_id: &str,
    now: DateTime<Utc>,
  ) -> Result<StreakSummary, EngineError> {
    match self.options.no_schedule {
      NoSchedulePolicy::Zero => Ok(StreakSummary::default()),
      NoSchedulePolicy::DailyLogging => {
        let weeks = self.options.periods.horizon.weeks.min(MAX_HORIZON_WEEKS);
        let lookback = Duration::days(i64::from(weeks) * 7 + 1);
        let start = now
          .checked_sub_signed(lookback)
          .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let logs = self.store.fetch_logs_in_range(user_id, start, now).await?;
        let timeline = LogTimeline::from_entries(&logs);
        Ok(StreakSummary {
          streak: daily_logging_streak(&timeline, now, &self.options.periods),
        })
      }
    }
  }
}
