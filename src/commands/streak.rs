//! Commands for streak, skip status and user stats

use serde::Serialize;

use crate::db::AppState;
use crate::periods::PeriodKey;
use crate::service::StreakService;
use crate::skip::SkipStatus;
use crate::store::{SqliteStore, TrainingStore};
use crate::streak::StreakSummary;

/// Stats shown on the athlete dashboard: the engine's outputs combined with
/// plain counters at the edge.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
  pub streak: u32,
  pub total_logs: i64,
  pub has_schedule: bool,
  #[serde(flatten)]
  pub skip: SkipStatus,
}

pub async fn get_streak(state: &AppState, user_id: &str) -> Result<StreakSummary, String> {
  let store = SqliteStore::new(state.db.clone());
  StreakService::new(&store, state.clock.as_ref(), state.options)
    .streak_for_user(user_id)
    .await
    .map_err(|e| format!("Failed to compute streak: {}", e))
}

pub async fn get_today_skip_status(state: &AppState, user_id: &str) -> Result<SkipStatus, String> {
  let store = SqliteStore::new(state.db.clone());
  StreakService::new(&store, state.clock.as_ref(), state.options)
    .skip_status_for_user(user_id)
    .await
    .map_err(|e| format!("Failed to compute skip status: {}", e))
}

pub async fn get_user_stats(state: &AppState, user_id: &str) -> Result<UserStats, String> {
  let store = SqliteStore::new(state.db.clone());
  let service = StreakService::new(&store, state.clock.as_ref(), state.options);

  let slots = store
    .fetch_user_training_slots(user_id)
    .await
    .map_err(|e| format!("Failed to fetch schedule: {}", e))?;
  let (summary, skip) = service
    .evaluate(user_id, &slots)
    .await
    .map_err(|e| format!("Failed to compute stats: {}", e))?;
  let total_logs = store
    .count_logs(user_id)
    .await
    .map_err(|e| format!("Failed to count logs: {}", e))?;

  Ok(UserStats {
    streak: summary.streak,
    total_logs,
    has_schedule: !slots.is_empty(),
    skip,
  })
}

/// Mark today's open obligation as intentionally skipped.
///
/// Eligibility is re-checked against the current data before anything is
/// written; past periods can never be skipped through here.
pub async fn skip_today(state: &AppState, user_id: &str) -> Result<Vec<PeriodKey>, String> {
  let store = SqliteStore::new(state.db.clone());
  let service = StreakService::new(&store, state.clock.as_ref(), state.options);
  let now = state.clock.now();

  let slots = store
    .fetch_user_training_slots(user_id)
    .await
    .map_err(|e| format!("Failed to fetch schedule: {}", e))?;
  let (status, targets) = service
    .skippable_periods(user_id, &slots)
    .await
    .map_err(|e| format!("Failed to compute skip status: {}", e))?;

  if let Some(reason) = status.skip_disabled_reason {
    log::warn!("Skip refused for {}: {}", user_id, reason);
    return Err(format!("Cannot skip today: {}", reason));
  }

  let mut recorded = Vec::with_capacity(targets.len());
  for (key, period_start) in targets {
    store
      .mark_period_skipped(user_id, &key, period_start, now)
      .await
      .map_err(|e| format!("Failed to record skip: {}", e))?;
    recorded.push(key);
  }

  log::info!("Recorded skip for {}: {:?}", user_id, recorded);
  Ok(recorded)
}
