//! Persistence collaborators for the compliance engine
//!
//! `TrainingStore` is the read surface the engine depends on. `SqliteStore`
//! implements it over the sqlx pool and also owns the write paths the
//! commands need (logs, schedules, group membership, skip markers).
//!
//! Instants are stored as INTEGER microseconds since the Unix epoch.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::models::{LogEntry, NewLogEntry, SlotInput, Visibility};
use crate::periods::PeriodKey;
use crate::schedule::Schedule;

// ---------------------------------------------------------------------------
/// Error Handling
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration failed: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("Corrupt stored value: {0}")]
  Corrupt(String),
}

// ---------------------------------------------------------------------------
/// Read Surface
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TrainingStore: Send + Sync {
  /// The user's own slots first, then slots inherited from their groups in
  /// membership order. Returned unvalidated.
  async fn fetch_user_training_slots(&self, user_id: &str) -> Result<Vec<SlotInput>, StoreError>;

  /// Logs with `start <= timestamp <= end`, oldest first.
  async fn fetch_logs_in_range(
    &self,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Vec<LogEntry>, StoreError>;

  async fn is_period_skipped(&self, user_id: &str, key: &PeriodKey) -> Result<bool, StoreError>;

  /// Every skip marker for periods starting at or after `since`.
  async fn fetch_skipped_periods(
    &self,
    user_id: &str,
    since: DateTime<Utc>,
  ) -> Result<HashSet<PeriodKey>, StoreError>;
}

fn to_micros(at: DateTime<Utc>) -> i64 {
  at.timestamp_micros()
}

fn from_micros(micros: i64) -> Result<DateTime<Utc>, StoreError> {
  DateTime::from_timestamp_micros(micros)
    .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {}", micros)))
}

#[derive(Debug, Clone, Copy)]
enum SlotOwner<'a> {
  User(&'a str),
  Group(&'a str),
}

impl SlotOwner<'_> {
  fn column(&self) -> &'static str {
    match self {
      SlotOwner::User(_) => "user_id",
      SlotOwner::Group(_) => "group_id",
    }
  }

  fn id(&self) -> &str {
    match self {
      SlotOwner::User(id) | SlotOwner::Group(id) => id,
    }
  }
}

// ---------------------------------------------------------------------------
/// SQLite Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  pub async fn create_log(&self, entry: &NewLogEntry, now: DateTime<Utc>) -> Result<i64, StoreError> {
    let tags_json = serde_json::to_string(&entry.tags)?;

    let result = sqlx::query(
      r#"
      INSERT INTO training_logs (user_id, logged_at, visibility, tags_json, notes, created_at)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6)
      "#,
    )
    .bind(&entry.user_id)
    .bind(to_micros(entry.timestamp))
    .bind(entry.visibility.to_string())
    .bind(&tags_json)
    .bind(&entry.notes)
    .bind(to_micros(now))
    .execute(&self.pool)
    .await?;

    Ok(result.last_insert_rowid())
  }

  /// Delete a log owned by `user_id`. Returns false when nothing matched.
  pub async fn delete_log(&self, user_id: &str, log_id: i64) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM training_logs WHERE id = ?1 AND user_id = ?2")
      .bind(log_id)
      .bind(user_id)
      .execute(&self.pool)
      .await?;

    Ok(result.rows_affected() > 0)
  }

  pub async fn count_logs(&self, user_id: &str) -> Result<i64, StoreError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM training_logs WHERE user_id = ?1")
      .bind(user_id)
      .fetch_one(&self.pool)
      .await?;

    Ok(count)
  }

  pub async fn set_user_slots(
    &self,
    user_id: &str,
    schedule: &Schedule,
    now: DateTime<Utc>,
  ) -> Result<(), StoreError> {
    self.replace_slots(SlotOwner::User(user_id), schedule, now).await
  }

  pub async fn set_group_slots(
    &self,
    group_id: &str,
    schedule: &Schedule,
    now: DateTime<Utc>,
  ) -> Result<(), StoreError> {
    self.replace_slots(SlotOwner::Group(group_id), schedule, now).await
  }

  /// Replace an owner's slots. Slots present before and after keep their
  /// original `created_at`, so editing a schedule never resets adoption.
  async fn replace_slots(
    &self,
    owner: SlotOwner<'_>,
    schedule: &Schedule,
    now: DateTime<Utc>,
  ) -> Result<(), StoreError> {
    let column = owner.column();
    let mut tx = self.pool.begin().await?;

    let existing: Vec<(i64, i64, String)> = sqlx::query_as(&format!(
      "SELECT id, day_of_week, time FROM training_slots WHERE {} = ?1",
      column
    ))
    .bind(owner.id())
    .fetch_all(&mut *tx)
    .await?;

    let wanted: Vec<(i64, String)> = schedule
      .slots()
      .iter()
      .map(|s| (i64::from(s.day_index()), s.time_label()))
      .collect();

    for (id, day, time) in &existing {
      if !wanted.iter().any(|(d, t)| d == day && t == time) {
        sqlx::query("DELETE FROM training_slots WHERE id = ?1")
          .bind(id)
          .execute(&mut *tx)
          .await?;
      }
    }

    for (day, time) in &wanted {
      if !existing.iter().any(|(_, d, t)| d == day && t == time) {
        sqlx::query(&format!(
          "INSERT INTO training_slots ({}, day_of_week, time, created_at) VALUES (?1, ?2, ?3, ?4)",
          column
        ))
        .bind(owner.id())
        .bind(day)
        .bind(time)
        .bind(to_micros(now))
        .execute(&mut *tx)
        .await?;
      }
    }

    tx.commit().await?;
    Ok(())
  }

  /// Add a user to a group. Joining twice keeps the first join time.
  pub async fn join_group(
    &self,
    user_id: &str,
    group_id: &str,
    joined_at: DateTime<Utc>,
  ) -> Result<(), StoreError> {
    sqlx::query(
      "INSERT OR IGNORE INTO group_members (group_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
    )
    .bind(group_id)
    .bind(user_id)
    .bind(to_micros(joined_at))
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  /// Record a skip marker. Returns false when the period was already skipped.
  pub async fn mark_period_skipped(
    &self,
    user_id: &str,
    key: &PeriodKey,
    period_start: DateTime<Utc>,
    now: DateTime<Utc>,
  ) -> Result<bool, StoreError> {
    let result = sqlx::query(
      r#"
      INSERT OR IGNORE INTO period_skips (user_id, period_key, period_start, skipped_at)
      VALUES (?1, ?2, ?3, ?4)
      "#,
    )
    .bind(user_id)
    .bind(key.as_str())
    .bind(to_micros(period_start))
    .bind(to_micros(now))
    .execute(&self.pool)
    .await?;

    Ok(result.rows_affected() > 0)
  }
}

#[async_trait]
impl TrainingStore for SqliteStore {
  async fn fetch_user_training_slots(&self, user_id: &str) -> Result<Vec<SlotInput>, StoreError> {
    let rows = sqlx::query(
      r#"
      SELECT day_of_week, time, NULL AS source_group_id, created_at AS adopted_at,
             0 AS source_rank, 0 AS joined, id AS slot_id
      FROM training_slots
      WHERE user_id = ?1
      UNION ALL
      SELECT s.day_of_week, s.time, s.group_id, MAX(s.created_at, m.joined_at),
             1, m.joined_at, s.id
      FROM training_slots s
      JOIN group_members m ON m.group_id = s.group_id
      WHERE m.user_id = ?1
      ORDER BY source_rank, joined, slot_id
      "#,
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;

    let mut slots = Vec::with_capacity(rows.len());
    for row in rows {
      slots.push(SlotInput {
        day_of_week: row.try_get("day_of_week")?,
        time: row.try_get("time")?,
        source_group_id: row.try_get("source_group_id")?,
        adopted_at: Some(from_micros(row.try_get("adopted_at")?)?),
      });
    }

    Ok(slots)
  }

  async fn fetch_logs_in_range(
    &self,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Vec<LogEntry>, StoreError> {
    let rows = sqlx::query(
      r#"
      SELECT id, user_id, logged_at, visibility, tags_json, notes
      FROM training_logs
      WHERE user_id = ?1 AND logged_at BETWEEN ?2 AND ?3
      ORDER BY logged_at
      "#,
    )
    .bind(user_id)
    .bind(to_micros(start))
    .bind(to_micros(end))
    .fetch_all(&self.pool)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
      let visibility: String = row.try_get("visibility")?;
      let tags_json: String = row.try_get("tags_json")?;

      entries.push(LogEntry {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        timestamp: from_micros(row.try_get("logged_at")?)?,
        visibility: visibility.parse::<Visibility>().map_err(StoreError::Corrupt)?,
        tags: serde_json::from_str(&tags_json)?,
        notes: row.try_get("notes")?,
      });
    }

    Ok(entries)
  }

  async fn is_period_skipped(&self, user_id: &str, key: &PeriodKey) -> Result<bool, StoreError> {
    let found: Option<i64> = sqlx::query_scalar(
      "SELECT 1 FROM period_skips WHERE user_id = ?1 AND period_key = ?2",
    )
    .bind(user_id)
    .bind(key.as_str())
    .fetch_optional(&self.pool)
    .await?;

    Ok(found.is_some())
  }

  async fn fetch_skipped_periods(
    &self,
    user_id: &str,
    since: DateTime<Utc>,
  ) -> Result<HashSet<PeriodKey>, StoreError> {
    let keys: Vec<String> = sqlx::query_scalar(
      "SELECT period_key FROM period_skips WHERE user_id = ?1 AND period_start >= ?2",
    )
    .bind(user_id)
    .bind(to_micros(since))
    .fetch_all(&self.pool)
    .await?;

    Ok(keys.into_iter().map(PeriodKey::from).collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{seed_logs, setup_test_db, teardown_test_db, utc};

  fn schedule(slots: &[SlotInput]) -> Schedule {
    Schedule::from_inputs(slots).unwrap()
  }

  #[tokio::test]
  async fn test_fetch_logs_in_range_is_inclusive() {
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());
    seed_logs(
      &store,
      "athlete-1",
      &[
        utc(2026, 10, 12, 0, 0),
        utc(2026, 10, 14, 12, 0),
        utc(2026, 10, 19, 0, 0),
      ],
    )
    .await;
    seed_logs(&store, "athlete-2", &[utc(2026, 10, 14, 12, 0)]).await;

    let logs = store
      .fetch_logs_in_range("athlete-1", utc(2026, 10, 12, 0, 0), utc(2026, 10, 19, 0, 0))
      .await
      .expect("Should fetch logs");
    assert_eq!(logs.len(), 3);
    assert!(logs.iter().all(|l| l.user_id == "athlete-1"));
    assert_eq!(logs[0].timestamp, utc(2026, 10, 12, 0, 0));

    let logs = store
      .fetch_logs_in_range(
        "athlete-1",
        utc(2026, 10, 12, 0, 0) + chrono::Duration::microseconds(1),
        utc(2026, 10, 19, 0, 0) - chrono::Duration::microseconds(1),
      )
      .await
      .expect("Should fetch logs");
    assert_eq!(logs.len(), 1);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_log_fields_roundtrip() {
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());

    let mut entry = NewLogEntry::at("athlete-1", utc(2026, 10, 12, 9, 30));
    entry.tags = vec!["intervals".to_string(), "track".to_string()];
    entry.notes = Some("6x400m".to_string());
    entry.visibility = Visibility::Private;
    let id = store.create_log(&entry, utc(2026, 10, 12, 10, 0)).await.unwrap();

    let logs = store
      .fetch_logs_in_range("athlete-1", utc(2026, 10, 12, 0, 0), utc(2026, 10, 13, 0, 0))
      .await
      .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].id, id);
    assert_eq!(logs[0].tags, vec!["intervals", "track"]);
    assert_eq!(logs[0].notes.as_deref(), Some("6x400m"));
    assert_eq!(logs[0].visibility, Visibility::Private);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_delete_log_requires_owner() {
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());
    let ids = seed_logs(&store, "athlete-1", &[utc(2026, 10, 12, 9, 30)]).await;

    assert!(!store.delete_log("athlete-2", ids[0]).await.unwrap());
    assert_eq!(store.count_logs("athlete-1").await.unwrap(), 1);

    assert!(store.delete_log("athlete-1", ids[0]).await.unwrap());
    assert_eq!(store.count_logs("athlete-1").await.unwrap(), 0);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_user_slots_before_group_slots() {
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());
    let t0 = utc(2026, 9, 1, 12, 0);

    store
      .set_group_slots("squad", &schedule(&[SlotInput::new(1, "09:00")]), t0)
      .await
      .unwrap();
    store.join_group("athlete-1", "squad", utc(2026, 9, 14, 8, 0)).await.unwrap();
    store
      .set_user_slots(
        "athlete-1",
        &schedule(&[SlotInput::new(1, "09:00"), SlotInput::new(3, "18:00")]),
        utc(2026, 9, 20, 12, 0),
      )
      .await
      .unwrap();

    let slots = store.fetch_user_training_slots("athlete-1").await.unwrap();
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[0].source_group_id, None);
    assert_eq!(slots[2].source_group_id.as_deref(), Some("squad"));
    // Inherited slots are adopted when the user joined, not when the group created them
    assert_eq!(slots[2].adopted_at, Some(utc(2026, 9, 14, 8, 0)));

    // Canonical schedule: user's own slot wins the duplicate, earliest adoption kept
    let canonical = Schedule::from_inputs(&slots).unwrap();
    assert_eq!(canonical.len(), 2);
    assert_eq!(canonical.slots()[0].source_group_id, None);
    assert_eq!(canonical.slots()[0].adopted_at, Some(utc(2026, 9, 14, 8, 0)));

    assert!(store.fetch_user_training_slots("nobody").await.unwrap().is_empty());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_replacing_schedule_keeps_adoption_of_unchanged_slots() {
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());
    let first = utc(2026, 9, 1, 12, 0);
    let second = utc(2026, 10, 1, 12, 0);

    store
      .set_user_slots("athlete-1", &schedule(&[SlotInput::new(1, "09:00")]), first)
      .await
      .unwrap();
    store
      .set_user_slots(
        "athlete-1",
        &schedule(&[SlotInput::new(1, "09:00"), SlotInput::new(5, "07:00")]),
        second,
      )
      .await
      .unwrap();

    let slots = store.fetch_user_training_slots("athlete-1").await.unwrap();
    let monday = slots.iter().find(|s| s.day_of_week == 1).unwrap();
    let friday = slots.iter().find(|s| s.day_of_week == 5).unwrap();
    assert_eq!(monday.adopted_at, Some(first));
    assert_eq!(friday.adopted_at, Some(second));

    store
      .set_user_slots("athlete-1", &Schedule::default(), second)
      .await
      .unwrap();
    assert!(store.fetch_user_training_slots("athlete-1").await.unwrap().is_empty());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_skip_markers() {
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());
    let key = PeriodKey::from("2026-10-12@09:00".to_string());
    let start = utc(2026, 10, 12, 0, 0);

    assert!(!store.is_period_skipped("athlete-1", &key).await.unwrap());
    assert!(store
      .mark_period_skipped("athlete-1", &key, start, utc(2026, 10, 12, 10, 0))
      .await
      .unwrap());
    assert!(!store
      .mark_period_skipped("athlete-1", &key, start, utc(2026, 10, 12, 11, 0))
      .await
      .unwrap());
    assert!(store.is_period_skipped("athlete-1", &key).await.unwrap());
    assert!(!store.is_period_skipped("athlete-2", &key).await.unwrap());

    let recent = store.fetch_skipped_periods("athlete-1", start).await.unwrap();
    assert!(recent.contains(&key));
    let later = store
      .fetch_skipped_periods("athlete-1", utc(2026, 10, 13, 0, 0))
      .await
      .unwrap();
    assert!(later.is_empty());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_corrupt_slot_rows_surface_as_validation_errors() {
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());

    sqlx::query(
      "INSERT INTO training_slots (user_id, day_of_week, time, created_at) VALUES ('athlete-1', 9, '9am', 0)",
    )
    .execute(&pool)
    .await
    .unwrap();

    let slots = store.fetch_user_training_slots("athlete-1").await.unwrap();
    assert_eq!(slots.len(), 1);
    assert!(Schedule::from_inputs(&slots).is_err());

    teardown_test_db(pool).await;
  }
}
