//! Error types for `rollcall-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid time {value:?}: expected H:mm or HH:mm (24-hour clock)")]
  InvalidTimeFormat { value: String },

  #[error("invalid shift name {0:?}")]
  InvalidShiftName(String),

  #[error("shift duration of {minutes} minutes exceeds one day")]
  InvalidDuration { minutes: u32 },

  #[error("shift name already in use: {0}")]
  DuplicateShiftName(String),

  #[error("unknown shift(s): {}", .0.join(", "))]
  UnknownShift(Vec<String>),

  #[error(
    "shift {name} is still referenced by {attendance} attendance record(s) \
     and {users} user(s)"
  )]
  ShiftInUse {
    name:       String,
    attendance: u64,
    users:      u64,
  },

  #[error("user not found: {0}")]
  UnknownUser(String),

  #[error("user already exists: {0}")]
  DuplicateUser(String),

  #[error("user {user_id} is already assigned to shift {shift}")]
  AlreadyAssigned { user_id: String, shift: String },

  #[error("user {user_id} is not assigned to shift {shift}")]
  NotAssigned { user_id: String, shift: String },

  #[error("no active shift for user {user_id} at {time}")]
  NoActiveShift { user_id: String, time: String },

  #[error(
    "check-in at {time} is outside shift {shift}: allowed {start} ± \
     {tolerance} minutes"
  )]
  InvalidCheckInTime {
    shift:     String,
    time:      String,
    start:     String,
    tolerance: u32,
  },

  #[error("check-out {seconds_elapsed}s after check-in; wait at least one minute")]
  TooSoon { seconds_elapsed: i64 },

  #[error("attendance for {user_id} on shift {shift} ({date}) is already complete")]
  AlreadyComplete {
    user_id: String,
    shift:   String,
    date:    chrono::NaiveDate,
  },

  /// A concurrent writer won the race for the same record.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
