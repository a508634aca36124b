use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use env_logger::Env;
use serde::Serialize;

use coach_log_lib::commands;
use coach_log_lib::models::{SlotInput, Visibility};
use coach_log_lib::{initialize_db, AppConfig, AppState, SystemClock};

#[derive(Parser)]
#[command(name = "coach-log")]
#[command(version = "0.1.0")]
#[command(about = "Training log streaks and schedule compliance", long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Current streak of consecutive satisfied periods
  Streak {
    #[arg(short, long)]
    user: String,
  },

  /// Whether today's training can be skipped
  SkipStatus {
    #[arg(short, long)]
    user: String,
  },

  /// Streak, log count and skip status in one view
  Stats {
    #[arg(short, long)]
    user: String,
  },

  /// Record a training log
  Log {
    #[arg(short, long)]
    user: String,

    /// RFC 3339 instant, defaults to now
    #[arg(long)]
    at: Option<DateTime<Utc>>,

    #[arg(short, long)]
    tag: Vec<String>,

    #[arg(short, long)]
    notes: Option<String>,

    /// coach | private
    #[arg(long)]
    visibility: Option<Visibility>,
  },

  /// Delete one of the user's logs
  DeleteLog {
    #[arg(short, long)]
    user: String,

    #[arg(long)]
    id: i64,
  },

  /// Skip today's scheduled training
  Skip {
    #[arg(short, long)]
    user: String,
  },

  /// Show the effective schedule
  Schedule {
    #[arg(short, long)]
    user: String,
  },

  /// Replace the user's own slots, e.g. `--slot 1@09:00 --slot 4@18:30`
  SetSchedule {
    #[arg(short, long)]
    user: String,

    #[arg(short, long)]
    slot: Vec<SlotInput>,
  },

  /// Replace a group's default slots
  SetGroupSchedule {
    #[arg(short, long)]
    group: String,

    #[arg(short, long)]
    slot: Vec<SlotInput>,
  },

  /// Add the user to a group, inheriting its slots from now on
  JoinGroup {
    #[arg(short, long)]
    user: String,

    #[arg(short, long)]
    group: String,
  },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
  let out = serde_json::to_string_pretty(value).map_err(|e| format!("Failed to encode output: {}", e))?;
  println!("{}", out);
  Ok(())
}

async fn run(cli: Cli) -> Result<(), String> {
  let config = AppConfig::from_env().map_err(|e| e.to_string())?;
  let db = initialize_db(&config.database_url)
    .await
    .map_err(|e| format!("Failed to initialize database: {}", e))?;

  let state = AppState {
    db,
    options: config.engine,
    clock: Arc::new(SystemClock),
  };

  match cli.command {
    Commands::Streak { user } => print_json(&commands::get_streak(&state, &user).await?),
    Commands::SkipStatus { user } => print_json(&commands::get_today_skip_status(&state, &user).await?),
    Commands::Stats { user } => print_json(&commands::get_user_stats(&state, &user).await?),
    Commands::Log {
      user,
      at,
      tag,
      notes,
      visibility,
    } => {
      let id = commands::log_training(&state, &user, at, tag, notes, visibility).await?;
      print_json(&serde_json::json!({ "id": id }))
    }
    Commands::DeleteLog { user, id } => {
      commands::delete_log(&state, &user, id).await?;
      print_json(&serde_json::json!({ "deleted": id }))
    }
    Commands::Skip { user } => print_json(&commands::skip_today(&state, &user).await?),
    Commands::Schedule { user } => print_json(&commands::get_schedule(&state, &user).await?),
    Commands::SetSchedule { user, slot } => {
      print_json(&commands::set_user_schedule(&state, &user, slot).await?)
    }
    Commands::SetGroupSchedule { group, slot } => {
      print_json(&commands::set_group_schedule(&state, &group, slot).await?)
    }
    Commands::JoinGroup { user, group } => {
      commands::join_group(&state, &user, &group).await?;
      print_json(&serde_json::json!({ "user": user, "group": group }))
    }
  }
}

#[tokio::main]
async fn main() {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();
  env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

  if let Err(e) = run(Cli::parse()).await {
    log::error!("{}", e);
    std::process::exit(1);
  }
}
