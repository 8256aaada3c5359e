//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Instants are naive local time stored as ISO 8601 strings without an
//! offset; dates as `YYYY-MM-DD`; times of day as `HH:mm`. Enums use their
//! snake_case serde names.

use chrono::{NaiveDate, NaiveDateTime};
use rollcall_core::{
  assignment::{AssignmentSet, ShiftAssignment, User},
  attendance::{AttendanceRecord, AttendanceStatus, CheckIn, CheckOut, PunchStatus},
  shift::Shift,
  time::ClockTime,
};
use uuid::Uuid;

use crate::{Error, Result};

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── NaiveDateTime / NaiveDate ───────────────────────────────────────────────

pub fn encode_dt(dt: NaiveDateTime) -> String { dt.format(DATETIME_FORMAT).to_string() }

pub fn decode_dt(s: &str) -> Result<NaiveDateTime> {
  NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
    .map_err(|e| Error::Decode(format!("bad timestamp {s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::Decode(format!("bad date {s:?}: {e}")))
}

// ─── ClockTime ────────────────────────────────────────────────────────────────

pub fn decode_time(s: &str) -> Result<ClockTime> { Ok(s.parse()?) }

// ─── Status enums ─────────────────────────────────────────────────────────────

pub fn encode_punch_status(s: PunchStatus) -> &'static str {
  match s {
    PunchStatus::OnTime => "on_time",
    PunchStatus::Late => "late",
    PunchStatus::Early => "early",
  }
}

pub fn decode_punch_status(s: &str) -> Result<PunchStatus> {
  match s {
    "on_time" => Ok(PunchStatus::OnTime),
    "late" => Ok(PunchStatus::Late),
    "early" => Ok(PunchStatus::Early),
    other => Err(Error::Decode(format!("unknown punch status: {other:?}"))),
  }
}

pub fn encode_attendance_status(s: AttendanceStatus) -> &'static str {
  match s {
    AttendanceStatus::Incomplete => "incomplete",
    AttendanceStatus::Present => "present",
    AttendanceStatus::Absent => "absent",
  }
}

pub fn decode_attendance_status(s: &str) -> Result<AttendanceStatus> {
  match s {
    "incomplete" => Ok(AttendanceStatus::Incomplete),
    "present" => Ok(AttendanceStatus::Present),
    "absent" => Ok(AttendanceStatus::Absent),
    other => Err(Error::Decode(format!("unknown attendance status: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const SHIFT_COLUMNS: &str = "name, start_time, end_time, tolerance_minutes, \
                                 active, description, created_at, updated_at";

/// Raw values read directly from a `shifts` row.
pub struct RawShift {
  pub name:              String,
  pub start_time:        String,
  pub end_time:          String,
  pub tolerance_minutes: u32,
  pub active:            bool,
  pub description:       String,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawShift {
  /// Read a row selected with [`SHIFT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      name:              row.get(0)?,
      start_time:        row.get(1)?,
      end_time:          row.get(2)?,
      tolerance_minutes: row.get(3)?,
      active:            row.get(4)?,
      description:       row.get(5)?,
      created_at:        row.get(6)?,
      updated_at:        row.get(7)?,
    })
  }

  pub fn into_shift(self) -> Result<Shift> {
    Ok(Shift {
      name:              self.name,
      start:             decode_time(&self.start_time)?,
      end:               decode_time(&self.end_time)?,
      tolerance_minutes: self.tolerance_minutes,
      active:            self.active,
      description:       self.description,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values from a `users` row plus its `assignments` rows in position
/// order.
pub struct RawUser {
  pub user_id:     String,
  pub name:        String,
  pub created_at:  String,
  /// `(shift_name, is_default)`
  pub assignments: Vec<(String, bool)>,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:         self.user_id,
      name:            self.name,
      assigned_shifts: AssignmentSet::from_entries(
        self
          .assignments
          .into_iter()
          .map(|(name, is_default)| ShiftAssignment::new(name, is_default)),
      ),
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

pub const ATTENDANCE_COLUMNS: &str = "record_id, user_id, shift_name, date, \
   check_in_time, check_in_at, check_in_status, \
   check_out_time, check_out_at, check_out_status, minutes_early, \
   work_duration, status, note, created_at, updated_at";

/// Raw values read directly from an `attendance` row.
pub struct RawAttendance {
  pub record_id:        String,
  pub user_id:          String,
  pub shift_name:       String,
  pub date:             String,
  pub check_in_time:    Option<String>,
  pub check_in_at:      Option<String>,
  pub check_in_status:  Option<String>,
  pub check_out_time:   Option<String>,
  pub check_out_at:     Option<String>,
  pub check_out_status: Option<String>,
  pub minutes_early:    u32,
  pub work_duration:    Option<String>,
  pub status:           String,
  pub note:             String,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawAttendance {
  /// Read a row selected with [`ATTENDANCE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:        row.get(0)?,
      user_id:          row.get(1)?,
      shift_name:       row.get(2)?,
      date:             row.get(3)?,
      check_in_time:    row.get(4)?,
      check_in_at:      row.get(5)?,
      check_in_status:  row.get(6)?,
      check_out_time:   row.get(7)?,
      check_out_at:     row.get(8)?,
      check_out_status: row.get(9)?,
      minutes_early:    row.get(10)?,
      work_duration:    row.get(11)?,
      status:           row.get(12)?,
      note:             row.get(13)?,
      created_at:       row.get(14)?,
      updated_at:       row.get(15)?,
    })
  }

  pub fn into_record(self) -> Result<AttendanceRecord> {
    // A punch only exists when all three of its columns are set.
    let check_in = match (self.check_in_time, self.check_in_at, self.check_in_status) {
      (Some(time), Some(at), Some(status)) => Some(CheckIn {
        time:      decode_time(&time)?,
        timestamp: decode_dt(&at)?,
        status:    decode_punch_status(&status)?,
      }),
      _ => None,
    };

    let check_out =
      match (self.check_out_time, self.check_out_at, self.check_out_status) {
        (Some(time), Some(at), Some(status)) => Some(CheckOut {
          time:          decode_time(&time)?,
          timestamp:     decode_dt(&at)?,
          status:        decode_punch_status(&status)?,
          minutes_early: self.minutes_early,
        }),
        _ => None,
      };

    Ok(AttendanceRecord {
      record_id: decode_uuid(&self.record_id)?,
      user_id: self.user_id,
      shift_name: self.shift_name,
      date: decode_date(&self.date)?,
      check_in,
      check_out,
      work_duration: self.work_duration,
      status: decode_attendance_status(&self.status)?,
      note: self.note,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
