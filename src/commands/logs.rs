//! Commands for recording and removing training logs

use chrono::{DateTime, Utc};

use crate::db::AppState;
use crate::models::{NewLogEntry, Visibility};
use crate::store::SqliteStore;

/// Record a training log. `timestamp` defaults to now.
pub async fn log_training(
  state: &AppState,
  user_id: &str,
  timestamp: Option<DateTime<Utc>>,
  tags: Vec<String>,
  notes: Option<String>,
  visibility: Option<Visibility>,
) -> Result<i64, String> {
  let now = state.clock.now();
  let entry = NewLogEntry {
    user_id: user_id.to_string(),
    timestamp: timestamp.unwrap_or(now),
    visibility: visibility.unwrap_or_default(),
    tags,
    notes,
  };

  let id = SqliteStore::new(state.db.clone())
    .create_log(&entry, now)
    .await
    .map_err(|e| format!("Failed to save log: {}", e))?;

  log::info!("Saved log {} for {} at {}", id, user_id, entry.timestamp);
  Ok(id)
}

/// Delete one of the user's own logs
pub async fn delete_log(state: &AppState, user_id: &str, log_id: i64) -> Result<(), String> {
  let deleted = SqliteStore::new(state.db.clone())
    .delete_log(user_id, log_id)
    .await
    .map_err(|e| format!("Failed to delete log: {}", e))?;

  if !deleted {
    return Err(format!("Log not found: {}", log_id));
  }
  Ok(())
}
