//! Period Calculator
//!
//! Turns a canonical schedule and a reference instant into compliance periods:
//! one week-long window per slot occurrence, from the most recent occurrence
//! back to the horizon. The result for a whole schedule is the merged,
//! time-descending union across slots.
//!
//! Local wall-clock time (slot day and time) is resolved with a fixed UTC
//! offset, so every week is exactly seven days long.

use chrono::{
  DateTime, Datelike, Days, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset,
  TimeZone, Utc,
};
use serde::{Deserialize, Serialize};

use crate::schedule::{Schedule, TrainingSlot};

/// Upper bound on the horizon, roughly a century of weekly periods.
pub const MAX_HORIZON_WEEKS: u32 = 5_200;

// ---------------------------------------------------------------------------
/// Window Anchor: where a period starts relative to its slot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowAnchor {
  /// Local midnight of the slot's day. A log earlier that day still counts.
  #[default]
  Day,
  /// The exact slot instant. Logs before the slot time belong to the prior week.
  SlotTime,
}

impl std::fmt::Display for WindowAnchor {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Day => write!(f, "day"),
      Self::SlotTime => write!(f, "slot_time"),
    }
  }
}

impl std::str::FromStr for WindowAnchor {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "day" => Ok(Self::Day),
      "slot_time" => Ok(Self::SlotTime),
      _ => Err(format!("Unknown window anchor: {}", s)),
    }
  }
}

// ---------------------------------------------------------------------------
/// Close Policy: when the most recent period stops being open
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClosePolicy {
  /// Open through the end of the slot's local day, judged afterwards.
  /// Logs later in the week still satisfy it.
  #[default]
  EndOfDay,
  /// Open until the whole week-long window has elapsed.
  EndOfWindow,
}

impl std::fmt::Display for ClosePolicy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::EndOfDay => write!(f, "end_of_day"),
      Self::EndOfWindow => write!(f, "end_of_window"),
    }
  }
}

impl std::str::FromStr for ClosePolicy {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "end_of_day" => Ok(Self::EndOfDay),
      "end_of_window" => Ok(Self::EndOfWindow),
      _ => Err(format!("Unknown close policy: {}", s)),
    }
  }
}

// ---------------------------------------------------------------------------
/// Horizon and options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horizon {
  /// Maximum number of periods generated per slot, open period included
  pub weeks: u32,
  /// No period may start before this instant (e.g. account creation)
  pub since: Option<DateTime<Utc>>,
}

impl Default for Horizon {
  fn default() -> Self {
    Self {
      weeks: 104,
      since: None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodOptions {
  pub offset: FixedOffset,
  pub anchor: WindowAnchor,
  pub close: ClosePolicy,
  pub horizon: Horizon,
}

impl Default for PeriodOptions {
  fn default() -> Self {
    Self {
      offset: Utc.fix(),
      anchor: WindowAnchor::default(),
      close: ClosePolicy::default(),
      horizon: Horizon::default(),
    }
  }
}

impl PeriodOptions {
  pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&self.offset).date_naive()
  }

  fn local_to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
    let shift = Duration::seconds(i64::from(self.offset.local_minus_utc()));
    Utc.from_utc_datetime(&(local - shift))
  }

  fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
    self.local_to_utc(date.and_time(NaiveTime::MIN))
  }

  /// Where the period of `slot` occurring on `date` starts.
  fn window_start(&self, date: NaiveDate, slot: &TrainingSlot) -> DateTime<Utc> {
    match self.anchor {
      WindowAnchor::Day => self.start_of_day(date),
      WindowAnchor::SlotTime => self.local_to_utc(date.and_time(slot.time)),
    }
  }

  /// Last instant of the local day `date`.
  fn end_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
    match date.checked_add_days(Days::new(1)) {
      Some(next) => self.start_of_day(next) - Duration::microseconds(1),
      None => DateTime::<Utc>::MAX_UTC,
    }
  }

  /// Earliest window start allowed for a slot: its adoption and the horizon's
  /// `since`, floored with the anchor policy so the adoption day itself counts.
  fn floor(&self, slot: &TrainingSlot) -> Option<DateTime<Utc>> {
    let floor_instant = |at: DateTime<Utc>| match self.anchor {
      WindowAnchor::Day => self.start_of_day(self.local_date(at)),
      WindowAnchor::SlotTime => at,
    };

    [slot.adopted_at, self.horizon.since]
      .into_iter()
      .flatten()
      .map(floor_instant)
      .max()
  }
}

// ---------------------------------------------------------------------------
/// Compliance Period
// ---------------------------------------------------------------------------

/// Stable identifier of one slot occurrence, `YYYY-MM-DD@HH:MM` in local time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodKey(String);

impl PeriodKey {
  pub fn new(occurs_on: NaiveDate, time: NaiveTime) -> Self {
    Self(format!("{}@{}", occurs_on.format("%Y-%m-%d"), time.format("%H:%M")))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<String> for PeriodKey {
  fn from(raw: String) -> Self {
    Self(raw)
  }
}

impl std::fmt::Display for PeriodKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompliancePeriod {
  pub slot: TrainingSlot,
  /// Local date the slot occurs on
  pub occurs_on: NaiveDate,
  pub window_start: DateTime<Utc>,
  /// Inclusive: the next occurrence's start minus one microsecond
  pub window_end: DateTime<Utc>,
  pub is_open: bool,
}

impl CompliancePeriod {
  pub fn key(&self) -> PeriodKey {
    PeriodKey::new(self.occurs_on, self.slot.time)
  }

  pub fn contains(&self, instant: DateTime<Utc>) -> bool {
    instant >= self.window_start && instant <= self.window_end
  }

  pub fn is_closed(&self) -> bool {
    !self.is_open
  }
}

// ---------------------------------------------------------------------------
/// Period computation
// ---------------------------------------------------------------------------

/// Periods of one slot, most recent first.
///
/// An occurrence that has not started yet is not generated, and nothing is
/// generated before the slot's adoption or past the horizon.
pub fn slot_periods(
  slot: &TrainingSlot,
  now: DateTime<Utc>,
  options: &PeriodOptions,
) -> Vec<CompliancePeriod> {
  let today = options.local_date(now);
  let days_back = (today.weekday().num_days_from_sunday() + 7 - slot.day_index()) % 7;

  let Some(mut occurs_on) = today.checked_sub_days(Days::new(u64::from(days_back))) else {
    return Vec::new();
  };
  if options.window_start(occurs_on, slot) > now {
    match occurs_on.checked_sub_days(Days::new(7)) {
      Some(previous) => occurs_on = previous,
      None => return Vec::new(),
    }
  }

  let floor = options.floor(slot);
  let limit = options.horizon.weeks.min(MAX_HORIZON_WEEKS) as usize;
  let mut periods = Vec::new();

  while periods.len() < limit {
    let window_start = options.window_start(occurs_on, slot);
    if floor.is_some_and(|floor| window_start < floor) {
      break;
    }

    let window_end = match occurs_on.checked_add_days(Days::new(7)) {
      Some(next) => options.window_start(next, slot) - Duration::microseconds(1),
      None => DateTime::<Utc>::MAX_UTC,
    };
    let closes_at = match options.close {
      ClosePolicy::EndOfDay => options.end_of_day(occurs_on),
      ClosePolicy::EndOfWindow => window_end,
    };

    periods.push(CompliancePeriod {
      slot: slot.clone(),
      occurs_on,
      window_start,
      window_end,
      is_open: now >= window_start && now <= closes_at,
    });

    match occurs_on.checked_sub_days(Days::new(7)) {
      Some(previous) => occurs_on = previous,
      None => break,
    }
  }

  periods
}

/// Merged, time-descending periods across every slot of the schedule.
/// Ties on `window_start` put the later slot time first.
pub fn merged_periods(
  schedule: &Schedule,
  now: DateTime<Utc>,
  options: &PeriodOptions,
) -> Vec<CompliancePeriod> {
  let mut periods: Vec<CompliancePeriod> = schedule
    .slots()
    .iter()
    .flat_map(|slot| slot_periods(slot, now, options))
    .collect();

  periods.sort_by(|a, b| {
    b.window_start
      .cmp(&a.window_start)
      .then_with(|| b.slot.time.cmp(&a.slot.time))
  });
  periods
}

/// Open periods whose slot occurs on the local date of `now`.
pub fn todays_periods<'a>(
  periods: &'a [CompliancePeriod],
  now: DateTime<Utc>,
  options: &PeriodOptions,
) -> Vec<&'a CompliancePeriod> {
  let today = options.local_date(now);
  periods
    .iter()
    .filter(|p| p.is_open && p.occurs_on == today)
    .collect()
}

/// Smallest range covering every period, for a single log read.
pub fn covering_range(periods: &[CompliancePeriod]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
  let start = periods.iter().map(|p| p.window_start).min()?;
  let end = periods.iter().map(|p| p.window_end).max()?;
  Some((start, end))
}
