//! Daily attendance records and the check-in / check-out state machine.
//!
//! One record exists per `(user, shift, date)`. It is created by the first
//! successful check-in and completed, exactly once, by the matching
//! check-out:
//!
//! ```text
//! None ──check-in──▶ CheckedIn ──check-out──▶ CheckedOut
//! ```
//!
//! Check-in is gated on the shift's start window. Check-out is never refused
//! for being off-schedule; earliness is recorded instead.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  shift::Shift,
  time::{ClockTime, MINUTES_PER_DAY, format_duration},
};

/// Minimum wall-clock gap between a check-in and its check-out.
pub const MIN_CHECK_OUT_DELAY_SECONDS: i64 = 60;

// ─── Status enums ────────────────────────────────────────────────────────────

/// Punctuality of a single check-in or check-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PunchStatus {
  OnTime,
  Late,
  Early,
}

/// Overall status of a day's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
  /// Checked in, not yet checked out.
  #[default]
  Incomplete,
  Present,
  /// Only ever written by an external absence process.
  Absent,
}

/// Position of a `(user, shift, date)` key in the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceState {
  None,
  CheckedIn,
  CheckedOut,
}

impl AttendanceState {
  pub fn of(record: Option<&AttendanceRecord>) -> Self {
    record.map_or(Self::None, AttendanceRecord::state)
  }
}

// ─── Sub-records ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
  pub time:      ClockTime,
  pub timestamp: NaiveDateTime,
  pub status:    PunchStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOut {
  pub time:          ClockTime,
  pub timestamp:     NaiveDateTime,
  pub status:        PunchStatus,
  /// Zero unless `status` is [`PunchStatus::Early`].
  pub minutes_early: u32,
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// The unique key of an attendance record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttendanceKey {
  pub user_id:    String,
  /// The shift name at the time of the event; renames do not rewrite it.
  pub shift_name: String,
  pub date:       NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub record_id:     Uuid,
  pub user_id:       String,
  pub shift_name:    String,
  pub date:          NaiveDate,
  /// Absent only on records written by an external absence process.
  pub check_in:      Option<CheckIn>,
  pub check_out:     Option<CheckOut>,
  /// `H:mm`, set once both punches exist.
  pub work_duration: Option<String>,
  pub status:        AttendanceStatus,
  pub note:          String,
  pub created_at:    NaiveDateTime,
  pub updated_at:    NaiveDateTime,
}

impl AttendanceRecord {
  /// Validate a check-in against `shift` and open a new record for `key`.
  pub fn check_in(
    key: AttendanceKey,
    shift: &Shift,
    now: NaiveDateTime,
  ) -> Result<Self> {
    let time = ClockTime::from_datetime(now);
    if !shift.is_valid_check_in_time(time) {
      return Err(Error::InvalidCheckInTime {
        shift:     shift.name.clone(),
        time:      time.to_string(),
        start:     shift.start.to_string(),
        tolerance: shift.tolerance_minutes,
      });
    }

    // Anything outside tolerance was rejected above, so a fresh check-in is
    // always on time; `Late` only appears on externally written records.
    let check_in = CheckIn { time, timestamp: now, status: PunchStatus::OnTime };

    Ok(Self {
      record_id:     Uuid::new_v4(),
      user_id:       key.user_id,
      shift_name:    key.shift_name,
      date:          key.date,
      check_in:      Some(check_in),
      check_out:     None,
      work_duration: None,
      status:        AttendanceStatus::Incomplete,
      note:          String::new(),
      created_at:    now,
      updated_at:    now,
    })
  }

  /// Record the check-out for an open record.
  ///
  /// Fails with [`Error::AlreadyComplete`] if the record is closed, or
  /// [`Error::TooSoon`] within a minute of the check-in.
  pub fn check_out(&mut self, shift: &Shift, now: NaiveDateTime) -> Result<&CheckOut> {
    let check_in = match (&self.check_in, &self.check_out) {
      (Some(check_in), None) => check_in,
      _ => {
        return Err(Error::AlreadyComplete {
          user_id: self.user_id.clone(),
          shift:   self.shift_name.clone(),
          date:    self.date,
        });
      }
    };

    let elapsed = (now - check_in.timestamp).num_seconds();
    if elapsed < MIN_CHECK_OUT_DELAY_SECONDS {
      return Err(Error::TooSoon { seconds_elapsed: elapsed });
    }

    let time = ClockTime::from_datetime(now);
    // Measured against the literal end time, with no overnight adjustment.
    let minutes_early =
      i64::from(shift.end.minutes()) - i64::from(time.minutes());
    let is_early = minutes_early > i64::from(shift.tolerance_minutes);

    let duration = work_duration_minutes(check_in.time, time);
    self.work_duration = Some(format_duration(duration));
    self.status = AttendanceStatus::Present;
    self.updated_at = now;

    Ok(self.check_out.insert(CheckOut {
      time,
      timestamp: now,
      status: if is_early { PunchStatus::Early } else { PunchStatus::OnTime },
      minutes_early: if is_early { minutes_early as u32 } else { 0 },
    }))
  }

  pub fn key(&self) -> AttendanceKey {
    AttendanceKey {
      user_id:    self.user_id.clone(),
      shift_name: self.shift_name.clone(),
      date:       self.date,
    }
  }

  pub fn state(&self) -> AttendanceState {
    match (&self.check_in, &self.check_out) {
      (Some(_), None) => AttendanceState::CheckedIn,
      _ => AttendanceState::CheckedOut,
    }
  }
}

/// Minutes worked between two times of day; a check-out numerically before
/// the check-in is taken to be after midnight.
pub fn work_duration_minutes(check_in: ClockTime, check_out: ClockTime) -> u32 {
  let start = check_in.minutes();
  let mut end = check_out.minutes();
  if end < start {
    end += MINUTES_PER_DAY;
  }
  end - start
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Which transition a mark-attendance request performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "record", rename_all = "snake_case")]
pub enum Punch {
  CheckedIn(AttendanceRecord),
  CheckedOut(AttendanceRecord),
}

impl Punch {
  pub fn record(&self) -> &AttendanceRecord {
    match self {
      Self::CheckedIn(r) | Self::CheckedOut(r) => r,
    }
  }

  pub fn into_record(self) -> AttendanceRecord {
    match self {
      Self::CheckedIn(r) | Self::CheckedOut(r) => r,
    }
  }

  /// A short human-readable summary.
  pub fn message(&self) -> String {
    match self {
      Self::CheckedIn(_) => "checked in".to_owned(),
      Self::CheckedOut(r) => match &r.check_out {
        Some(out) if out.status == PunchStatus::Early => format!(
          "checked out {} minutes before the end of shift {}",
          out.minutes_early, r.shift_name
        ),
        _ => "checked out".to_owned(),
      },
    }
  }
}
