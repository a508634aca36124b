//! Schedule Model
//!
//! Normalizes a user's recurring training slots (personal and group-inherited)
//! into a canonical set keyed by `(day_of_week, time)`, ordered Sunday first
//! and then by time of day.
//!
//! An empty schedule is valid and means no compliance obligation exists.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Serialize, Serializer};

use crate::models::SlotInput;

// ---------------------------------------------------------------------------
/// Error Handling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
  #[error("Invalid day of week: {0} (expected 0=Sunday through 6=Saturday)")]
  InvalidDayOfWeek(i64),

  #[error("Invalid slot time: {0:?} (expected 24h HH:mm)")]
  InvalidTime(String),
}

// ---------------------------------------------------------------------------
/// Training Slot
// ---------------------------------------------------------------------------

/// A validated recurring weekly commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainingSlot {
  #[serde(serialize_with = "serialize_weekday")]
  pub day_of_week: Weekday,
  #[serde(serialize_with = "serialize_time")]
  pub time: NaiveTime,
  pub source_group_id: Option<String>,
  pub adopted_at: Option<DateTime<Utc>>,
}

impl TrainingSlot {
  pub fn new(day_of_week: Weekday, time: NaiveTime) -> Self {
    Self {
      day_of_week,
      time,
      source_group_id: None,
      adopted_at: None,
    }
  }

  /// Validate a raw slot. Out-of-range days and unparsable times are errors.
  pub fn from_input(input: &SlotInput) -> Result<Self, ScheduleError> {
    Ok(Self {
      day_of_week: weekday_from_sunday_index(input.day_of_week)?,
      time: parse_slot_time(&input.time)?,
      source_group_id: input.source_group_id.clone(),
      adopted_at: input.adopted_at,
    })
  }

  /// Sunday-based day index, matching the wire format.
  pub fn day_index(&self) -> u32 {
    self.day_of_week.num_days_from_sunday()
  }

  pub fn time_label(&self) -> String {
    self.time.format("%H:%M").to_string()
  }

  fn key(&self) -> (u32, NaiveTime) {
    (self.day_index(), self.time)
  }
}

fn serialize_weekday<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_u32(day.num_days_from_sunday())
}

fn serialize_time<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_str(&time.format("%H:%M").to_string())
}

pub fn weekday_from_sunday_index(day: i64) -> Result<Weekday, ScheduleError> {
  match day {
    0 => Ok(Weekday::Sun),
    1 => Ok(Weekday::Mon),
    2 => Ok(Weekday::Tue),
    3 => Ok(Weekday::Wed),
    4 => Ok(Weekday::Thu),
    5 => Ok(Weekday::Fri),
    6 => Ok(Weekday::Sat),
    _ => Err(ScheduleError::InvalidDayOfWeek(day)),
  }
}

/// Strict `HH:mm`: two-digit hour 00-23, two-digit minute 00-59.
pub fn parse_slot_time(raw: &str) -> Result<NaiveTime, ScheduleError> {
  let invalid = || ScheduleError::InvalidTime(raw.to_string());

  let (hour, minute) = raw.split_once(':').ok_or_else(invalid)?;
  if hour.len() != 2 || minute.len() != 2 {
    return Err(invalid());
  }
  if !hour.bytes().chain(minute.bytes()).all(|b| b.is_ascii_digit()) {
    return Err(invalid());
  }

  let hour: u32 = hour.parse().map_err(|_| invalid())?;
  let minute: u32 = minute.parse().map_err(|_| invalid())?;
  NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

// ---------------------------------------------------------------------------
/// Canonical Schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schedule {
  slots: Vec<TrainingSlot>,
}

impl Schedule {
  /// Build the canonical schedule from raw slots.
  ///
  /// Duplicates on `(day_of_week, time)` collapse into one slot. The first
  /// occurrence keeps its `source_group_id`; the earliest adoption time among
  /// the duplicates is kept, since the commitment existed from then on.
  /// A single malformed slot rejects the whole input.
  pub fn from_inputs(inputs: &[SlotInput]) -> Result<Self, ScheduleError> {
    let mut slots: Vec<TrainingSlot> = Vec::with_capacity(inputs.len());

    for input in inputs {
      let slot = TrainingSlot::from_input(input)?;
      match slots.iter_mut().find(|s| s.key() == slot.key()) {
        Some(existing) => {
          existing.adopted_at = match (existing.adopted_at, slot.adopted_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            // An unknown adoption time means "always had it"
            _ => None,
          };
        }
        None => slots.push(slot),
      }
    }

    slots.sort_by_key(|s| s.key());
    Ok(Self { slots })
  }

  pub fn is_empty(&self) -> bool {
    self.slots.is_empty()
  }

  pub fn len(&self) -> usize {
    self.slots.len()
  }

  pub fn slots(&self) -> &[TrainingSlot] {
    &self.slots
  }

  /// Slots scheduled on the given weekday, in time order.
  pub fn slots_on(&self, day: Weekday) -> impl Iterator<Item = &TrainingSlot> {
    self.slots.iter().filter(move |s| s.day_of_week == day)
  }
}
