//! [`Tracker`], the entry point for every attendance and shift operation.
//!
//! The tracker owns no state of its own. It combines an [`AttendanceStore`]
//! with a [`Clock`], applies the pure rules from the sibling modules, and
//! leaves atomicity to the store.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  assignment::{AssignmentSet, NewUser, ShiftAssignment, User},
  attendance::{AttendanceKey, AttendanceRecord, AttendanceState, Punch},
  resolver,
  shift::{DEFAULT_TOLERANCE_MINUTES, NewShift, Shift, ShiftUpdate, validate_name},
  store::{AttendanceQuery, AttendanceStore},
  time::{Clock, ClockTime, SystemClock},
};

fn store_err<E: Into<Error>>(e: E) -> Error { e.into() }

/// Snapshot of one `(user, shift, date)` key.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceSnapshot {
  pub state:  AttendanceState,
  pub record: Option<AttendanceRecord>,
}

impl AttendanceSnapshot {
  pub fn has_checked_in(&self) -> bool { self.state != AttendanceState::None }

  pub fn has_checked_out(&self) -> bool {
    self.state == AttendanceState::CheckedOut
  }
}

pub struct Tracker<S, C = SystemClock> {
  store:             Arc<S>,
  clock:             C,
  default_tolerance: u32,
}

impl<S, C: Clone> Clone for Tracker<S, C> {
  fn clone(&self) -> Self {
    Self {
      store:             Arc::clone(&self.store),
      clock:             self.clock.clone(),
      default_tolerance: self.default_tolerance,
    }
  }
}

impl<S> Tracker<S, SystemClock>
where
  S: AttendanceStore,
{
  /// A tracker reading the local wall clock.
  pub fn with_system_clock(store: Arc<S>) -> Self { Self::new(store, SystemClock) }
}

impl<S, C> Tracker<S, C>
where
  S: AttendanceStore,
  C: Clock,
{
  pub fn new(store: Arc<S>, clock: C) -> Self {
    Self { store, clock, default_tolerance: DEFAULT_TOLERANCE_MINUTES }
  }

  /// Tolerance used for new shifts that do not specify one.
  pub fn with_default_tolerance(mut self, minutes: u32) -> Self {
    self.default_tolerance = minutes;
    self
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn clock(&self) -> &C { &self.clock }

  // ── Shifts ────────────────────────────────────────────────────────────

  pub async fn create_shift(&self, input: NewShift) -> Result<Shift> {
    let shift = Shift::new(input, self.default_tolerance, self.clock.now())?;
    let shift = self.store.create_shift(shift).await.map_err(store_err)?;
    info!(
      shift = %shift.name,
      start = %shift.start,
      end = %shift.end,
      tolerance = shift.tolerance_minutes,
      "shift created"
    );
    Ok(shift)
  }

  pub async fn get_shift(&self, name: &str) -> Result<Option<Shift>> {
    self.store.get_shift(name.to_owned()).await.map_err(store_err)
  }

  pub async fn list_shifts(&self, active_only: bool) -> Result<Vec<Shift>> {
    self.store.list_shifts(active_only).await.map_err(store_err)
  }

  /// Update the time fields, tolerance, description, or active flag.
  /// Deactivating is the soft-delete path for shifts with history.
  pub async fn update_shift(&self, name: &str, update: ShiftUpdate) -> Result<Shift> {
    let mut shift = self.require_shift(name).await?;
    shift.apply(update, self.clock.now())?;
    let shift = self.store.update_shift(shift).await.map_err(store_err)?;
    info!(shift = %shift.name, active = shift.active, "shift updated");
    Ok(shift)
  }

  /// Rename a shift, carrying every assignment along with it.
  pub async fn rename_shift(&self, old_name: &str, new_name: &str) -> Result<Shift> {
    let new_name = validate_name(new_name)?;
    let shift = self
      .store
      .rename_shift(old_name.to_owned(), new_name, self.clock.now())
      .await
      .map_err(store_err)?;
    info!(from = old_name, to = %shift.name, "shift renamed");
    Ok(shift)
  }

  pub async fn delete_shift(&self, name: &str) -> Result<()> {
    self
      .store
      .delete_shift(name.to_owned())
      .await
      .map_err(store_err)
      .inspect_err(|e| warn!(shift = name, error = %e, "shift not deleted"))?;
    info!(shift = name, "shift deleted");
    Ok(())
  }

  // ── Users and assignments ─────────────────────────────────────────────

  pub async fn add_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:         input.user_id,
      name:            input.name,
      assigned_shifts: AssignmentSet::new(),
      created_at:      self.clock.now(),
    };
    let user = self.store.add_user(user).await.map_err(store_err)?;
    info!(user = %user.user_id, "user added");
    Ok(user)
  }

  pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
    self.store.get_user(user_id.to_owned()).await.map_err(store_err)
  }

  pub async fn list_users(&self) -> Result<Vec<User>> {
    self.store.list_users().await.map_err(store_err)
  }

  /// Delete a user and, with it, their attendance history.
  pub async fn delete_user(&self, user_id: &str) -> Result<u64> {
    let removed = self
      .store
      .delete_user(user_id.to_owned())
      .await
      .map_err(store_err)?;
    info!(user = user_id, attendance_removed = removed, "user deleted");
    Ok(removed)
  }

  pub async fn assign_shift(
    &self,
    user_id: &str,
    shift_name: &str,
    is_default: bool,
  ) -> Result<AssignmentSet> {
    let (user, shift) = (user_id.to_owned(), shift_name.to_owned());
    self
      .edit_assignments(user_id, move |set| set.add(&user, &shift, is_default))
      .await
  }

  pub async fn unassign_shift(
    &self,
    user_id: &str,
    shift_name: &str,
  ) -> Result<AssignmentSet> {
    let (user, shift) = (user_id.to_owned(), shift_name.to_owned());
    self
      .edit_assignments(user_id, move |set| set.remove(&user, &shift))
      .await
  }

  pub async fn set_default_shift(
    &self,
    user_id: &str,
    shift_name: &str,
  ) -> Result<AssignmentSet> {
    let (user, shift) = (user_id.to_owned(), shift_name.to_owned());
    self
      .edit_assignments(user_id, move |set| set.set_default(&user, &shift))
      .await
  }

  /// Replace the whole assignment set. Every referenced shift must exist;
  /// the error lists all that do not.
  pub async fn replace_assignments(
    &self,
    user_id: &str,
    entries: Vec<ShiftAssignment>,
  ) -> Result<AssignmentSet> {
    self.require_user(user_id).await?;
    let set = AssignmentSet::from_entries(entries);

    let names: Vec<String> = set.shift_names().map(str::to_owned).collect();
    let found = self.store.get_shifts(names.clone()).await.map_err(store_err)?;
    let missing: Vec<String> = names
      .into_iter()
      .filter(|n| !found.iter().any(|s| &s.name == n))
      .collect();
    if !missing.is_empty() {
      return Err(Error::UnknownShift(missing));
    }

    self.save(user_id, set).await
  }

  // ── Attendance ────────────────────────────────────────────────────────

  /// The shift `user_id` is working right now, if any.
  pub async fn current_shift(&self, user_id: &str) -> Result<Option<Shift>> {
    let user = self.require_user(user_id).await?;
    let now = ClockTime::from_datetime(self.clock.now());
    self.resolve(&user, now).await
  }

  /// Check the user in or out of their current shift.
  ///
  /// With no record for today this is a check-in, with an open record a
  /// check-out, and with a completed record it fails with
  /// [`Error::AlreadyComplete`].
  pub async fn mark_attendance(&self, user_id: &str) -> Result<Punch> {
    let now = self.clock.now();
    let time = ClockTime::from_datetime(now);

    let user = self.require_user(user_id).await?;
    let shift = self.resolve(&user, time).await?.ok_or_else(|| {
      warn!(user = user_id, %time, "no active shift");
      Error::NoActiveShift { user_id: user_id.to_owned(), time: time.to_string() }
    })?;

    let key = AttendanceKey {
      user_id:    user_id.to_owned(),
      shift_name: shift.name.clone(),
      date:       shift.attendance_date(now),
    };
    let existing = self
      .store
      .find_attendance(key.clone())
      .await
      .map_err(store_err)?;

    let result = match existing {
      None => self.check_in(key, &shift, now).await,
      Some(record) => self.check_out(record, &shift, now).await,
    };
    result.inspect_err(|e| {
      warn!(user = user_id, shift = %shift.name, %time, error = %e, "attendance rejected");
    })
  }

  /// Where `user_id` stands on `shift_name` for `date`.
  ///
  /// Without a date, the key is the run of the shift that "now" belongs to,
  /// so after midnight an overnight shift reports yesterday's record. An
  /// unknown shift falls back to the calendar date.
  pub async fn current_status(
    &self,
    user_id: &str,
    shift_name: &str,
    date: Option<NaiveDate>,
  ) -> Result<AttendanceSnapshot> {
    let date = match date {
      Some(date) => date,
      None => {
        let now = self.clock.now();
        match self.get_shift(shift_name).await? {
          Some(shift) => shift.attendance_date(now),
          None => now.date(),
        }
      }
    };
    let key = AttendanceKey {
      user_id:    user_id.to_owned(),
      shift_name: shift_name.to_owned(),
      date,
    };
    let record = self.store.find_attendance(key).await.map_err(store_err)?;
    Ok(AttendanceSnapshot { state: AttendanceState::of(record.as_ref()), record })
  }

  pub async fn list_attendance(
    &self,
    query: AttendanceQuery,
  ) -> Result<Vec<AttendanceRecord>> {
    self.store.list_attendance(query).await.map_err(store_err)
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  async fn check_in(
    &self,
    key: AttendanceKey,
    shift: &Shift,
    now: chrono::NaiveDateTime,
  ) -> Result<Punch> {
    let record = AttendanceRecord::check_in(key, shift, now)?;
    let record = self.store.insert_attendance(record).await.map_err(store_err)?;
    info!(
      user = %record.user_id,
      shift = %record.shift_name,
      date = %record.date,
      "checked in"
    );
    Ok(Punch::CheckedIn(record))
  }

  async fn check_out(
    &self,
    mut record: AttendanceRecord,
    shift: &Shift,
    now: chrono::NaiveDateTime,
  ) -> Result<Punch> {
    record.check_out(shift, now)?;
    let record = self
      .store
      .complete_attendance(record)
      .await
      .map_err(store_err)?;
    info!(
      user = %record.user_id,
      shift = %record.shift_name,
      date = %record.date,
      worked = record.work_duration.as_deref().unwrap_or_default(),
      "checked out"
    );
    Ok(Punch::CheckedOut(record))
  }

  async fn resolve(&self, user: &User, now: ClockTime) -> Result<Option<Shift>> {
    let names: Vec<String> =
      user.assigned_shifts.shift_names().map(str::to_owned).collect();
    let shifts = self.store.get_shifts(names).await.map_err(store_err)?;
    let resolved = resolver::resolve(&user.assigned_shifts, &shifts, now).cloned();
    debug!(
      user = %user.user_id,
      %now,
      shift = resolved.as_ref().map(|s| s.name.as_str()),
      "resolved shift"
    );
    Ok(resolved)
  }

  async fn require_user(&self, user_id: &str) -> Result<User> {
    self
      .store
      .get_user(user_id.to_owned())
      .await
      .map_err(store_err)?
      .ok_or_else(|| Error::UnknownUser(user_id.to_owned()))
  }

  async fn require_shift(&self, name: &str) -> Result<Shift> {
    self
      .get_shift(name)
      .await?
      .ok_or_else(|| Error::UnknownShift(vec![name.to_owned()]))
  }

  async fn edit_assignments<F>(&self, user_id: &str, edit: F) -> Result<AssignmentSet>
  where
    F: FnOnce(&mut AssignmentSet) -> Result<()> + Send + 'static,
  {
    let set = self
      .store
      .update_assignments(user_id.to_owned(), edit)
      .await
      .map_err(store_err)?;
    debug!(user = user_id, assignments = set.len(), "assignments updated");
    Ok(set)
  }

  async fn save(&self, user_id: &str, set: AssignmentSet) -> Result<AssignmentSet> {
    self
      .store
      .save_assignments(user_id.to_owned(), set.clone())
      .await
      .map_err(store_err)?;
    debug!(user = user_id, assignments = set.len(), "assignments saved");
    Ok(set)
  }
}
