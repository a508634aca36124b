use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who may see a log entry. Irrelevant to compliance, kept for the log store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
  /// Athlete and their coaches
  #[default]
  Coach,
  /// Athlete only
  Private,
}

impl std::fmt::Display for Visibility {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Coach => write!(f, "coach"),
      Self::Private => write!(f, "private"),
    }
  }
}

impl std::str::FromStr for Visibility {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "coach" => Ok(Self::Coach),
      "private" => Ok(Self::Private),
      _ => Err(format!("Unknown visibility: {}", s)),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
  pub id: i64,
  pub user_id: String,
  pub timestamp: DateTime<Utc>,
  pub visibility: Visibility,
  pub tags: Vec<String>,
  pub notes: Option<String>,
}

/// For inserting new log entries (without id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLogEntry {
  pub user_id: String,
  pub timestamp: DateTime<Utc>,
  #[serde(default)]
  pub visibility: Visibility,
  #[serde(default)]
  pub tags: Vec<String>,
  pub notes: Option<String>,
}

impl NewLogEntry {
  pub fn at(user_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
    Self {
      user_id: user_id.into(),
      timestamp,
      visibility: Visibility::default(),
      tags: Vec::new(),
      notes: None,
    }
  }
}
