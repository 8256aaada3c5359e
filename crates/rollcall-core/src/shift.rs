//! Shifts: named daily work windows with a symmetric tolerance.
//!
//! A shift whose end is numerically before its start runs overnight. Two
//! families of predicates exist: the narrow boundary checks used to validate
//! a check-in or check-out, and the permissive whole-span check used when
//! resolving which shift an employee is currently working.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  time::{
    ClockTime, MINUTES_PER_DAY, format_duration, normalize_overnight,
    within_tolerance,
  },
};

/// Tolerance applied when a new shift does not specify one.
pub const DEFAULT_TOLERANCE_MINUTES: u32 = 15;

// ─── Shift ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
  /// Unique across all shifts.
  pub name:              String,
  pub start:             ClockTime,
  pub end:               ClockTime,
  pub tolerance_minutes: u32,
  /// Inactive shifts are never resolved but stay around for history.
  pub active:            bool,
  pub description:       String,
  pub created_at:        NaiveDateTime,
  pub updated_at:        NaiveDateTime,
}

impl Shift {
  /// Validate `input` and build a new active shift.
  pub fn new(
    input: NewShift,
    default_tolerance: u32,
    now: NaiveDateTime,
  ) -> Result<Self> {
    let name = validate_name(&input.name)?;
    let (start, end) = validate_window(&input.start, &input.end)?;
    Ok(Self {
      name,
      start,
      end,
      tolerance_minutes: input.tolerance_minutes.unwrap_or(default_tolerance),
      active: true,
      description: input.description.unwrap_or_default(),
      created_at: now,
      updated_at: now,
    })
  }

  /// Apply a partial update in place. Time fields are re-validated together,
  /// so an update to only one end is checked against the existing other end.
  pub fn apply(&mut self, update: ShiftUpdate, now: NaiveDateTime) -> Result<()> {
    let start = match update.start.as_deref() {
      Some(s) => s.parse()?,
      None => self.start,
    };
    let end = match update.end.as_deref() {
      Some(s) => s.parse()?,
      None => self.end,
    };
    check_duration(start, end)?;

    self.start = start;
    self.end = end;
    if let Some(tolerance) = update.tolerance_minutes {
      self.tolerance_minutes = tolerance;
    }
    if let Some(description) = update.description {
      self.description = description;
    }
    if let Some(active) = update.active {
      self.active = active;
    }
    self.updated_at = now;
    Ok(())
  }

  pub fn is_overnight(&self) -> bool { self.end < self.start }

  /// Length of the shift in minutes, crossing midnight if needed.
  pub fn duration_minutes(&self) -> u32 {
    let (start, end) =
      normalize_overnight(self.start.minutes(), self.end.minutes());
    end - start
  }

  /// [`Self::duration_minutes`] rendered as `H:mm`.
  pub fn duration_label(&self) -> String {
    format_duration(self.duration_minutes())
  }

  /// A check-in must land within tolerance of the literal start time.
  pub fn is_valid_check_in_time(&self, at: ClockTime) -> bool {
    within_tolerance(self.start.minutes(), at.minutes(), self.tolerance_minutes)
  }

  /// A check-out is on time within tolerance of the literal end time.
  pub fn is_valid_check_out_time(&self, at: ClockTime) -> bool {
    within_tolerance(self.end.minutes(), at.minutes(), self.tolerance_minutes)
  }

  /// Whether `at` falls anywhere in `[start - tolerance, end + tolerance]`,
  /// with the end (and, for overnight shifts, the probe) carried past
  /// midnight as needed.
  pub fn is_within_shift_time(&self, at: ClockTime) -> bool {
    let tolerance = i64::from(self.tolerance_minutes);
    let (start, end) =
      normalize_overnight(self.start.minutes(), self.end.minutes());
    let (start, end) = (i64::from(start), i64::from(end));
    let opens = start - tolerance;

    let mut probe = i64::from(at.minutes());
    if self.is_overnight() && probe < opens {
      probe += i64::from(MINUTES_PER_DAY);
    }

    probe >= opens && probe <= end + tolerance
  }

  /// The calendar date an attendance event at `at` belongs to.
  ///
  /// Overnight shifts are dated by the day they started: before today's
  /// check-in window opens, an event belongs to yesterday's run of the shift.
  pub fn attendance_date(&self, at: NaiveDateTime) -> NaiveDate {
    let today = at.date();
    let opens = i64::from(self.start.minutes())
      - i64::from(self.tolerance_minutes);
    let probe = i64::from(ClockTime::from_datetime(at).minutes());

    if self.is_overnight() && probe < opens {
      today.pred_opt().unwrap_or(today)
    } else {
      today
    }
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::tracker::Tracker::create_shift`]. Times are raw `HH:mm`
/// strings and are validated on construction.
#[derive(Debug, Clone, Deserialize)]
pub struct NewShift {
  pub name:              String,
  pub start:             String,
  pub end:               String,
  pub tolerance_minutes: Option<u32>,
  pub description:       Option<String>,
}

impl NewShift {
  pub fn new(
    name: impl Into<String>,
    start: impl Into<String>,
    end: impl Into<String>,
  ) -> Self {
    Self {
      name:              name.into(),
      start:             start.into(),
      end:               end.into(),
      tolerance_minutes: None,
      description:       None,
    }
  }

  pub fn tolerance(mut self, minutes: u32) -> Self {
    self.tolerance_minutes = Some(minutes);
    self
  }
}

/// Partial update of a shift. Renames go through
/// [`crate::tracker::Tracker::rename_shift`] instead, since they cascade.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShiftUpdate {
  pub start:             Option<String>,
  pub end:               Option<String>,
  pub tolerance_minutes: Option<u32>,
  pub description:       Option<String>,
  pub active:            Option<bool>,
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Trim a shift name, rejecting empty ones.
pub fn validate_name(name: &str) -> Result<String> {
  let trimmed = name.trim();
  if trimmed.is_empty() {
    return Err(Error::InvalidShiftName(name.to_owned()));
  }
  Ok(trimmed.to_owned())
}

/// Parse a start/end pair and check the window it describes.
pub fn validate_window(start: &str, end: &str) -> Result<(ClockTime, ClockTime)> {
  let start: ClockTime = start.parse()?;
  let end: ClockTime = end.parse()?;
  check_duration(start, end)?;
  Ok((start, end))
}

// Zero-length shifts (end == start) are accepted.
fn check_duration(start: ClockTime, end: ClockTime) -> Result<()> {
  let (s, e) = normalize_overnight(start.minutes(), end.minutes());
  let minutes = e - s;
  if minutes > MINUTES_PER_DAY {
    return Err(Error::InvalidDuration { minutes });
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 14)
      .unwrap()
      .and_hms_opt(h, m, 0)
      .unwrap()
  }

  fn t(s: &str) -> ClockTime { s.parse().unwrap() }

  fn shift(start: &str, end: &str, tolerance: u32) -> Shift {
    Shift::new(
      NewShift::new("Test", start, end).tolerance(tolerance),
      DEFAULT_TOLERANCE_MINUTES,
      at(0, 0),
    )
    .unwrap()
  }

  #[test]
  fn new_shift_uses_default_tolerance_and_trims_name() {
    let s = Shift::new(
      NewShift::new("  Morning ", "09:00", "17:00"),
      DEFAULT_TOLERANCE_MINUTES,
      at(8, 0),
    )
    .unwrap();
    assert_eq!(s.name, "Morning");
    assert_eq!(s.tolerance_minutes, 15);
    assert!(s.active);
    assert_eq!(s.description, "");
  }

  #[test]
  fn new_shift_rejects_bad_input() {
    let err = Shift::new(NewShift::new("X", "9am", "17:00"), 15, at(0, 0))
      .unwrap_err();
    assert!(matches!(err, Error::InvalidTimeFormat { value } if value == "9am"));

    let err =
      Shift::new(NewShift::new("  ", "09:00", "17:00"), 15, at(0, 0)).unwrap_err();
    assert!(matches!(err, Error::InvalidShiftName(_)));
  }

  #[test]
  fn duration_handles_overnight_and_zero_length() {
    assert_eq!(shift("09:00", "17:00", 15).duration_minutes(), 480);
    assert_eq!(shift("22:00", "06:00", 15).duration_minutes(), 480);
    assert_eq!(shift("22:00", "06:00", 15).duration_label(), "8:00");
    assert_eq!(shift("10:00", "10:00", 15).duration_minutes(), 0);
  }

  #[test]
  fn check_in_window_is_narrow_around_start() {
    let morning = shift("09:00", "17:00", 15);
    assert!(morning.is_valid_check_in_time(t("08:50")));
    assert!(morning.is_valid_check_in_time(t("09:15")));
    assert!(!morning.is_valid_check_in_time(t("08:30")));
    assert!(!morning.is_valid_check_in_time(t("12:00")));
  }

  #[test]
  fn check_out_window_is_narrow_around_end() {
    let morning = shift("09:00", "17:00", 15);
    assert!(morning.is_valid_check_out_time(t("16:50")));
    assert!(morning.is_valid_check_out_time(t("17:15")));
    assert!(!morning.is_valid_check_out_time(t("16:00")));
  }

  #[test]
  fn shift_span_includes_boundaries_regardless_of_tolerance() {
    for tolerance in [0, 5, 30] {
      for s in [shift("09:00", "17:00", tolerance), shift("22:00", "06:00", tolerance)] {
        assert!(s.is_within_shift_time(s.start), "{s:?}");
        assert!(s.is_within_shift_time(s.end), "{s:?}");
      }
    }
  }

  #[test]
  fn shift_span_for_day_shift() {
    let morning = shift("09:00", "17:00", 15);
    assert!(morning.is_within_shift_time(t("08:45")));
    assert!(morning.is_within_shift_time(t("12:00")));
    assert!(morning.is_within_shift_time(t("17:15")));
    assert!(!morning.is_within_shift_time(t("08:44")));
    assert!(!morning.is_within_shift_time(t("17:16")));
    assert!(!morning.is_within_shift_time(t("03:00")));
  }

  #[test]
  fn shift_span_for_overnight_shift() {
    let night = shift("22:00", "06:00", 15);
    assert!(night.is_within_shift_time(t("21:45")));
    assert!(night.is_within_shift_time(t("23:30")));
    assert!(night.is_within_shift_time(t("00:00")));
    assert!(night.is_within_shift_time(t("06:15")));
    assert!(!night.is_within_shift_time(t("06:16")));
    assert!(!night.is_within_shift_time(t("12:00")));
    assert!(!night.is_within_shift_time(t("21:44")));
  }

  #[test]
  fn overnight_events_are_dated_by_shift_start() {
    let night = shift("22:00", "06:00", 15);
    let today = at(0, 0).date();
    assert_eq!(night.attendance_date(at(21, 50)), today);
    assert_eq!(night.attendance_date(at(23, 0)), today);
    assert_eq!(night.attendance_date(at(5, 30)), today.pred_opt().unwrap());

    let morning = shift("09:00", "17:00", 15);
    assert_eq!(morning.attendance_date(at(5, 30)), today);
  }

  #[test]
  fn apply_revalidates_times() {
    let mut s = shift("09:00", "17:00", 15);
    let err = s
      .apply(
        ShiftUpdate { end: Some("5pm".into()), ..Default::default() },
        at(10, 0),
      )
      .unwrap_err();
    assert!(matches!(err, Error::InvalidTimeFormat { .. }));
    assert_eq!(s.end, t("17:00"));

    s.apply(
      ShiftUpdate {
        end: Some("01:00".into()),
        active: Some(false),
        ..Default::default()
      },
      at(10, 0),
    )
    .unwrap();
    assert_eq!(s.duration_minutes(), 16 * 60);
    assert!(!s.active);
    assert_eq!(s.updated_at, at(10, 0));
  }
}
