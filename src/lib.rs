pub mod clock;
pub mod commands;
pub mod compliance;
pub mod config;
pub mod db;
pub mod models;
pub mod periods;
pub mod schedule;
pub mod service;
pub mod skip;
pub mod store;
pub mod streak;

#[cfg(test)]
pub(crate) mod test_utils;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AppConfig;
pub use db::{initialize_db, AppState};
pub use periods::{ClosePolicy, CompliancePeriod, Horizon, PeriodKey, PeriodOptions, WindowAnchor};
pub use schedule::{Schedule, ScheduleError, TrainingSlot};
pub use service::{EngineError, EngineOptions, StreakService};
pub use skip::{SkipDisabledReason, SkipStatus};
pub use store::{SqliteStore, StoreError, TrainingStore};
pub use streak::{NoSchedulePolicy, StreakSummary};
