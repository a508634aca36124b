//! Environment-driven configuration
//!
//! `.env` is loaded by the binary via dotenvy; everything here reads plain
//! environment variables so tests can override them with temp-env.

use std::env;
use std::str::FromStr;

use chrono::FixedOffset;

use crate::periods::{ClosePolicy, Horizon, PeriodOptions, WindowAnchor, MAX_HORIZON_WEEKS};
use crate::service::EngineOptions;
use crate::streak::NoSchedulePolicy;

// ---------------------------------------------------------------------------
/// Configuration Constants
// ---------------------------------------------------------------------------

const DEFAULT_DATABASE_URL: &str = "sqlite://coach-log.db?mode=rwc";
const DEFAULT_HORIZON_WEEKS: u32 = 104;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
  #[error("Invalid value for {key}: {value:?} ({reason})")]
  Invalid {
    key: &'static str,
    value: String,
    reason: String,
  },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
  pub database_url: String,
  pub engine: EngineOptions,
}

impl AppConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    let offset_minutes: i32 = parse_var("TRAINING_UTC_OFFSET_MINUTES", 0)?;
    let offset = offset_minutes
      .checked_mul(60)
      .and_then(FixedOffset::east_opt)
      .ok_or_else(|| ConfigError::Invalid {
        key: "TRAINING_UTC_OFFSET_MINUTES",
        value: offset_minutes.to_string(),
        reason: "offset must be within +/- 24h".to_string(),
      })?;

    let weeks: u32 = parse_var("STREAK_HORIZON_WEEKS", DEFAULT_HORIZON_WEEKS)?;
    if weeks == 0 || weeks > MAX_HORIZON_WEEKS {
      return Err(ConfigError::Invalid {
        key: "STREAK_HORIZON_WEEKS",
        value: weeks.to_string(),
        reason: format!("must be between 1 and {}", MAX_HORIZON_WEEKS),
      });
    }

    Ok(Self {
      database_url: env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
      engine: EngineOptions {
        periods: PeriodOptions {
          offset,
          anchor: parse_var::<WindowAnchor>("STREAK_WINDOW_ANCHOR", WindowAnchor::default())?,
          close: parse_var::<ClosePolicy>("STREAK_CLOSE_POLICY", ClosePolicy::default())?,
          horizon: Horizon { weeks, since: None },
        },
        no_schedule: parse_var::<NoSchedulePolicy>("NO_SCHEDULE_STREAK", NoSchedulePolicy::default())?,
      },
    })
  }
}

/// Read and parse `key`, falling back to `default` only when it is unset.
fn parse_var<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match env::var(key) {
    Ok(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
      key,
      value: raw.clone(),
      reason: e.to_string(),
    }),
    Err(_) => Ok(default),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  const KEYS: [&str; 6] = [
    "DATABASE_URL",
    "TRAINING_UTC_OFFSET_MINUTES",
    "STREAK_WINDOW_ANCHOR",
    "STREAK_CLOSE_POLICY",
    "STREAK_HORIZON_WEEKS",
    "NO_SCHEDULE_STREAK",
  ];

  /// Every key exactly once: overridden ones set, the rest unset.
  fn vars(overrides: &[(&'static str, &'static str)]) -> Vec<(&'static str, Option<&'static str>)> {
    KEYS
      .iter()
      .map(|key| {
        let value = overrides.iter().find(|(k, _)| k == key).map(|(_, v)| *v);
        (*key, value)
      })
      .collect()
  }

  #[test]
  #[serial]
  fn test_defaults() {
    temp_env::with_vars(vars(&[]), || {
      let config = AppConfig::from_env().unwrap();
      assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
      assert_eq!(config.engine, EngineOptions::default());
      assert_eq!(config.engine.periods.horizon.weeks, 104);
    });
  }

  #[test]
  #[serial]
  fn test_overrides() {
    let overrides = vars(&[
      ("DATABASE_URL", "sqlite::memory:"),
      ("TRAINING_UTC_OFFSET_MINUTES", "-300"),
      ("STREAK_WINDOW_ANCHOR", "slot_time"),
      ("STREAK_CLOSE_POLICY", "end_of_window"),
      ("STREAK_HORIZON_WEEKS", "12"),
      ("NO_SCHEDULE_STREAK", "daily_logging"),
    ]);

    temp_env::with_vars(overrides, || {
      let config = AppConfig::from_env().unwrap();
      assert_eq!(config.database_url, "sqlite::memory:");
      assert_eq!(config.engine.periods.offset.local_minus_utc(), -300 * 60);
      assert_eq!(config.engine.periods.anchor, WindowAnchor::SlotTime);
      assert_eq!(config.engine.periods.close, ClosePolicy::EndOfWindow);
      assert_eq!(config.engine.periods.horizon.weeks, 12);
      assert_eq!(config.engine.no_schedule, NoSchedulePolicy::DailyLogging);
    });
  }

  #[test]
  #[serial]
  fn test_invalid_values_are_errors_not_defaults() {
    temp_env::with_vars(vars(&[("STREAK_WINDOW_ANCHOR", "noon")]), || {
      let err = AppConfig::from_env().unwrap_err();
      assert!(err.to_string().contains("STREAK_WINDOW_ANCHOR"));
    });

    temp_env::with_vars(vars(&[("STREAK_HORIZON_WEEKS", "0")]), || {
      assert!(AppConfig::from_env().is_err());
    });

    temp_env::with_vars(vars(&[("TRAINING_UTC_OFFSET_MINUTES", "1500")]), || {
      assert!(AppConfig::from_env().is_err());
    });
  }
}
