//! Wall-clock helpers.
//!
//! Every time of day in the system is a naive local `HH:mm` value, held
//! internally as a minute-of-day offset. Intervals that cross midnight are
//! normalised by pushing their end one day forward; see
//! [`normalize_overnight`].

use std::{fmt, str::FromStr, sync::Mutex};

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Minutes in one calendar day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

// ─── ClockTime ───────────────────────────────────────────────────────────────

/// A time of day with minute precision, `00:00` through `23:59`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
  pub const MIDNIGHT: Self = Self(0);

  /// Build from an hour and minute, returning `None` when out of range.
  pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
    (hour < 24 && minute < 60).then(|| Self((hour * 60 + minute) as u16))
  }

  /// Build from a minute-of-day offset, returning `None` past `23:59`.
  pub fn from_minutes(minutes: u32) -> Option<Self> {
    (minutes < MINUTES_PER_DAY).then_some(Self(minutes as u16))
  }

  /// The time of day of `at`, truncated to the minute.
  pub fn from_datetime(at: NaiveDateTime) -> Self {
    Self((at.hour() * 60 + at.minute()) as u16)
  }

  pub fn minutes(self) -> u32 { u32::from(self.0) }

  pub fn hour(self) -> u32 { self.minutes() / 60 }

  pub fn minute(self) -> u32 { self.minutes() % 60 }
}

/// Parse `H:mm` or `HH:mm` into minutes past midnight.
pub fn to_minutes(value: &str) -> Result<u32> {
  value.parse::<ClockTime>().map(ClockTime::minutes)
}

impl FromStr for ClockTime {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidTimeFormat { value: s.to_owned() };

    let (hour, minute) = s.split_once(':').ok_or_else(invalid)?;
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !(1..=2).contains(&hour.len())
      || minute.len() != 2
      || !all_digits(hour)
      || !all_digits(minute)
    {
      return Err(invalid());
    }

    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    Self::from_hm(hour, minute).ok_or_else(invalid)
  }
}

impl TryFrom<String> for ClockTime {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { value.parse() }
}

impl From<ClockTime> for String {
  fn from(t: ClockTime) -> Self { t.to_string() }
}

impl fmt::Display for ClockTime {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:02}:{:02}", self.hour(), self.minute())
  }
}

// ─── Interval arithmetic ─────────────────────────────────────────────────────

/// `true` iff `probe` lies within `tolerance` minutes of `target`. Both values
/// are plain minute offsets; callers normalise wraparound first.
pub fn within_tolerance(target: u32, probe: u32, tolerance: u32) -> bool {
  target.abs_diff(probe) <= tolerance
}

/// Return `(start, end')` where `end'` is `end` pushed forward one day if the
/// interval crosses midnight.
pub fn normalize_overnight(start: u32, end: u32) -> (u32, u32) {
  if end < start {
    (start, end + MINUTES_PER_DAY)
  } else {
    (start, end)
  }
}

/// Render a minute count as `H:mm`, e.g. `470` → `"7:50"`.
pub fn format_duration(minutes: u32) -> String {
  format!("{}:{:02}", minutes / 60, minutes % 60)
}

// ─── Clock ───────────────────────────────────────────────────────────────────

/// Source of the current instant. Injected so tests can pin the time.
pub trait Clock: Send + Sync {
  fn now(&self) -> NaiveDateTime;
}

/// The local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> NaiveDateTime { Local::now().naive_local() }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock(Mutex<NaiveDateTime>);

impl FixedClock {
  pub fn new(at: NaiveDateTime) -> Self { Self(Mutex::new(at)) }

  pub fn set(&self, at: NaiveDateTime) {
    *self.0.lock().unwrap_or_else(|e| e.into_inner()) = at;
  }

  pub fn advance(&self, by: chrono::Duration) {
    let mut guard = self.0.lock().unwrap_or_else(|e| e.into_inner());
    *guard += by;
  }
}

impl Clock for FixedClock {
  fn now(&self) -> NaiveDateTime {
    *self.0.lock().unwrap_or_else(|e| e.into_inner())
  }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
  fn now(&self) -> NaiveDateTime { (**self).now() }
}
