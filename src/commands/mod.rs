//! Command layer: thin async functions over `AppState`
//!
//! Each command opens a store over the shared pool, runs one operation and
//! maps every error to a display string for the caller.

pub mod logs;
pub mod schedule;
pub mod streak;

pub use logs::{delete_log, log_training};
pub use schedule::{get_schedule, join_group, set_group_schedule, set_user_schedule};
pub use streak::{get_streak, get_today_skip_status, get_user_stats, skip_today, UserStats};
