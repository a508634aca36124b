use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recurring weekly training slot as stored or received, before validation.
///
/// `day_of_week` counts from Sunday (0) to Saturday (6) and `time` is a 24h
/// `HH:mm` string. Nothing here is checked; `Schedule::from_inputs` rejects
/// malformed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInput {
  pub day_of_week: i64,
  pub time: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_group_id: Option<String>,
  /// When the user took the slot on. Periods before this never count as missed.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub adopted_at: Option<DateTime<Utc>>,
}

impl SlotInput {
  pub fn new(day_of_week: i64, time: impl Into<String>) -> Self {
    Self {
      day_of_week,
      time: time.into(),
      source_group_id: None,
      adopted_at: None,
    }
  }

  pub fn from_group(mut self, group_id: impl Into<String>) -> Self {
    self.source_group_id = Some(group_id.into());
    self
  }

  pub fn adopted_at(mut self, at: DateTime<Utc>) -> Self {
    self.adopted_at = Some(at);
    self
  }
}

impl std::str::FromStr for SlotInput {
  type Err = String;

  /// Parses the `<day>@<HH:mm>` shorthand, e.g. `1@09:00` for Monday 09:00.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (day, time) = s
      .split_once('@')
      .ok_or_else(|| format!("Expected <day>@<HH:mm>, got: {}", s))?;
    let day_of_week: i64 = day
      .trim()
      .parse()
      .map_err(|_| format!("Invalid day of week: {}", day))?;
    Ok(SlotInput::new(day_of_week, time.trim()))
  }
}
