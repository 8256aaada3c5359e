//! The `AttendanceStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `rollcall-store-sqlite`). [`crate::tracker::Tracker`] and the HTTP layer
//! depend on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  assignment::{AssignmentSet, User},
  attendance::{AttendanceKey, AttendanceRecord},
  shift::Shift,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`AttendanceStore::list_attendance`].
#[derive(Debug, Clone, Default)]
pub struct AttendanceQuery {
  pub user_id:    Option<String>,
  pub shift_name: Option<String>,
  /// Inclusive lower bound on the record date.
  pub from:       Option<NaiveDate>,
  /// Inclusive upper bound on the record date.
  pub to:         Option<NaiveDate>,
  pub limit:      Option<usize>,
  pub offset:     Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a rollcall storage backend.
///
/// Backends own the uniqueness constraints: shift names, user ids, and the
/// `(user, shift, date)` attendance key. Business-rule failures are reported
/// through `Self::Error` and converted back into [`crate::Error`] by the
/// caller, so a backend must map them onto the matching variant.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait AttendanceStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Shifts ────────────────────────────────────────────────────────────

  /// Persist a new shift. Fails with `DuplicateShiftName` if the name is
  /// taken.
  fn create_shift(
    &self,
    shift: Shift,
  ) -> impl Future<Output = Result<Shift, Self::Error>> + Send + '_;

  fn get_shift(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<Shift>, Self::Error>> + Send + '_;

  /// Fetch the shifts with the given names; unknown names are skipped.
  fn get_shifts(
    &self,
    names: Vec<String>,
  ) -> impl Future<Output = Result<Vec<Shift>, Self::Error>> + Send + '_;

  fn list_shifts(
    &self,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<Shift>, Self::Error>> + Send + '_;

  /// Overwrite every field of an existing shift except its name. Fails with
  /// `UnknownShift` if no shift has that name.
  fn update_shift(
    &self,
    shift: Shift,
  ) -> impl Future<Output = Result<Shift, Self::Error>> + Send + '_;

  /// Rename a shift and every assignment that references it, atomically.
  ///
  /// Attendance records keep the name they were written with. Fails with
  /// `UnknownShift` or `DuplicateShiftName`; on failure nothing changes.
  fn rename_shift(
    &self,
    old_name: String,
    new_name: String,
    updated_at: chrono::NaiveDateTime,
  ) -> impl Future<Output = Result<Shift, Self::Error>> + Send + '_;

  /// Remove a shift. Fails with `ShiftInUse` while any attendance record or
  /// assignment references it, and with `UnknownShift` if it does not exist.
  fn delete_shift(
    &self,
    name: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a new user together with its assignments. Fails with
  /// `DuplicateUser` or `UnknownShift`.
  fn add_user(
    &self,
    user: User,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    user_id: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Delete a user with its assignments and attendance history. Returns the
  /// number of attendance records removed.
  fn delete_user(
    &self,
    user_id: String,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Replace a user's whole assignment set in one transaction.
  ///
  /// Every referenced shift must exist at commit time; otherwise the call
  /// fails with `UnknownShift` listing all missing names and nothing changes.
  fn save_assignments(
    &self,
    user_id: String,
    assignments: AssignmentSet,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Read a user's assignment set, apply `edit`, and write it back, all in
  /// one transaction. Concurrent edits on the same user serialise.
  ///
  /// An error from `edit` aborts without writing. Fails with `UnknownUser`,
  /// or with `UnknownShift` if the edited set references a missing shift.
  /// Returns the set as stored.
  fn update_assignments<F>(
    &self,
    user_id: String,
    edit: F,
  ) -> impl Future<Output = Result<AssignmentSet, Self::Error>> + Send + '_
  where
    F: FnOnce(&mut AssignmentSet) -> crate::Result<()> + Send + 'static;

  // ── Attendance ────────────────────────────────────────────────────────

  fn find_attendance(
    &self,
    key: AttendanceKey,
  ) -> impl Future<Output = Result<Option<AttendanceRecord>, Self::Error>> + Send + '_;

  /// Insert-if-absent on the record's key. A concurrent insert for the same
  /// key that got there first makes this fail with `Conflict`.
  fn insert_attendance(
    &self,
    record: AttendanceRecord,
  ) -> impl Future<Output = Result<AttendanceRecord, Self::Error>> + Send + '_;

  /// Write the check-out fields of `record` only if the stored record has no
  /// check-out yet. Fails with `AlreadyComplete` otherwise.
  fn complete_attendance(
    &self,
    record: AttendanceRecord,
  ) -> impl Future<Output = Result<AttendanceRecord, Self::Error>> + Send + '_;

  /// Newest date first.
  fn list_attendance(
    &self,
    query: AttendanceQuery,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + '_;
}
