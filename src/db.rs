use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;

use crate::clock::Clock;
use crate::service::EngineOptions;
use crate::store::StoreError;

pub type DbPool = SqlitePool;

/// Application state shared by every command
pub struct AppState {
  pub db: DbPool,
  pub options: EngineOptions,
  pub clock: Arc<dyn Clock>,
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(database_url: &str) -> Result<DbPool, StoreError> {
  log::info!("Initializing database at: {}", database_url);

  // Create connection pool
  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(database_url)
    .await?;

  // Run migrations
  sqlx::migrate!("./migrations").run(&pool).await?;

  log::info!("Database initialized successfully");

  Ok(pool)
}
