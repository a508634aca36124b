//! Test utilities and helpers for unit and database-backed testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Seed helpers for logs and schedules
//! - Fixed-date fixtures (nothing here reads the wall clock)

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::SqlitePool;

use crate::clock::FixedClock;
use crate::db::AppState;
use crate::models::NewLogEntry;
use crate::service::EngineOptions;
use crate::store::SqliteStore;

// ---------------------------------------------------------------------------
/// Database Test Utilities
// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  // Run migrations
  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// App state over `pool` with a clock frozen at `now`
pub fn test_state(pool: SqlitePool, now: DateTime<Utc>) -> AppState {
  AppState {
    db: pool,
    options: EngineOptions::default(),
    clock: Arc::new(FixedClock(now)),
  }
}

/// Insert one plain log per timestamp for `user_id`
/// Returns the IDs of created logs, in input order
pub async fn seed_logs(store: &SqliteStore, user_id: &str, timestamps: &[DateTime<Utc>]) -> Vec<i64> {
  let mut ids = Vec::new();

  for ts in timestamps {
    let id = store
      .create_log(&NewLogEntry::at(user_id, *ts), *ts)
      .await
      .expect("Failed to insert test log");
    ids.push(id);
  }

  ids
}

// ---------------------------------------------------------------------------
/// Time Fixtures
// ---------------------------------------------------------------------------

/// Build a UTC instant at minute precision
pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
  Utc
    .with_ymd_and_hms(year, month, day, hour, minute, 0)
    .single()
    .expect("Invalid test datetime")
}

/// Logs at 09:30 on the 2026-09-21, 09-28 and 10-05 Mondays.
/// The next Monday, 2026-10-12, is the "fourth" Monday in the scenarios.
pub fn three_logged_mondays() -> Vec<DateTime<Utc>> {
  vec![
    utc(2026, 9, 21, 9, 30),
    utc(2026, 9, 28, 9, 30),
    utc(2026, 10, 5, 9, 30),
  ]
}

// ---------------------------------------------------------------------------
/// Tests for Test Utilities
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Datelike, Weekday};

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    // Verify key tables exist
    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('training_logs', 'training_slots', 'group_members', 'period_skips')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 4, "Expected 4 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_logs_returns_correct_count() {
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());

    let ids = seed_logs(&store, "athlete-1", &three_logged_mondays()).await;
    assert_eq!(ids.len(), 3);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM training_logs")
      .fetch_one(&pool)
      .await
      .expect("Failed to count logs");

    assert_eq!(count, 3);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_fixture_mondays_are_mondays() {
    for ts in three_logged_mondays() {
      assert_eq!(ts.weekday(), Weekday::Mon);
    }
    assert_eq!(utc(2026, 10, 12, 0, 0).weekday(), Weekday::Mon);
  }
}
