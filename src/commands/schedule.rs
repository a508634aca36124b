//! Commands for personal and group training schedules

use crate::db::AppState;
use crate::models::SlotInput;
use crate::schedule::Schedule;
use crate::store::{SqliteStore, TrainingStore};

fn validate(owner: &str, slots: &[SlotInput]) -> Result<Schedule, String> {
  Schedule::from_inputs(slots).map_err(|e| {
    log::warn!("Rejected schedule for {}: {}", owner, e);
    format!("Invalid schedule: {}", e)
  })
}

/// Replace the user's own slots. Returns the canonical schedule stored.
pub async fn set_user_schedule(
  state: &AppState,
  user_id: &str,
  slots: Vec<SlotInput>,
) -> Result<Schedule, String> {
  let schedule = validate(user_id, &slots)?;
  SqliteStore::new(state.db.clone())
    .set_user_slots(user_id, &schedule, state.clock.now())
    .await
    .map_err(|e| format!("Failed to save schedule: {}", e))?;
  Ok(schedule)
}

/// Replace a group's default slots, inherited by every member.
pub async fn set_group_schedule(
  state: &AppState,
  group_id: &str,
  slots: Vec<SlotInput>,
) -> Result<Schedule, String> {
  let schedule = validate(group_id, &slots)?;
  SqliteStore::new(state.db.clone())
    .set_group_slots(group_id, &schedule, state.clock.now())
    .await
    .map_err(|e| format!("Failed to save group schedule: {}", e))?;
  Ok(schedule)
}

pub async fn join_group(state: &AppState, user_id: &str, group_id: &str) -> Result<(), String> {
  SqliteStore::new(state.db.clone())
    .join_group(user_id, group_id, state.clock.now())
    .await
    .map_err(|e| format!("Failed to join group: {}", e))
}

/// The user's effective schedule: own slots merged with inherited ones.
pub async fn get_schedule(state: &AppState, user_id: &str) -> Result<Schedule, String> {
  let slots = SqliteStore::new(state.db.clone())
    .fetch_user_training_slots(user_id)
    .await
    .map_err(|e| format!("Failed to fetch schedule: {}", e))?;
  Schedule::from_inputs(&slots).map_err(|e| format!("Stored schedule is invalid: {}", e))
}
