//! [`SqliteStore`], the SQLite implementation of [`AttendanceStore`].

use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use rollcall_core::{
  Error as CoreError,
  assignment::{AssignmentSet, ShiftAssignment, User},
  attendance::{AttendanceKey, AttendanceRecord},
  shift::Shift,
  store::{AttendanceQuery, AttendanceStore},
};

use crate::{
  Error, Result,
  encode::{
    ATTENDANCE_COLUMNS, RawAttendance, RawShift, RawUser, SHIFT_COLUMNS,
    encode_attendance_status, encode_date, encode_dt, encode_punch_status,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Constraint helpers ──────────────────────────────────────────────────────

fn extended_code(e: &rusqlite::Error) -> Option<std::os::raw::c_int> {
  match e {
    rusqlite::Error::SqliteFailure(err, _) => Some(err.extended_code),
    _ => None,
  }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    extended_code(e),
    Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
      | Some(rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
  )
}

fn is_foreign_key_violation(e: &rusqlite::Error) -> bool {
  extended_code(e) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
}

// ─── Connection-level helpers ────────────────────────────────────────────────
//
// These run inside `Connection::call` closures, on the database thread.

fn row_exists(
  conn: &rusqlite::Connection,
  sql: &str,
  key: &str,
) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(sql, rusqlite::params![key], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

fn read_assignments(
  conn: &rusqlite::Connection,
  user_id: &str,
) -> rusqlite::Result<Vec<(String, bool)>> {
  let mut stmt = conn.prepare(
    "SELECT shift_name, is_default FROM assignments
     WHERE user_id = ?1 ORDER BY position",
  )?;
  stmt
    .query_map(rusqlite::params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
    .collect()
}

fn read_user(
  conn: &rusqlite::Connection,
  user_id: &str,
) -> rusqlite::Result<Option<RawUser>> {
  let head: Option<(String, String, String)> = conn
    .query_row(
      "SELECT user_id, name, created_at FROM users WHERE user_id = ?1",
      rusqlite::params![user_id],
      |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
    .optional()?;

  let Some((user_id, name, created_at)) = head else {
    return Ok(None);
  };
  let assignments = read_assignments(conn, &user_id)?;
  Ok(Some(RawUser { user_id, name, created_at, assignments }))
}

/// Replace the user's assignment rows. Returns the names of any referenced
/// shifts that do not exist, in which case nothing is written.
fn write_assignments(
  tx: &rusqlite::Transaction<'_>,
  user_id: &str,
  entries: &[(String, bool)],
) -> rusqlite::Result<Vec<String>> {
  let mut missing = Vec::new();
  for (name, _) in entries {
    if !row_exists(tx, "SELECT 1 FROM shifts WHERE name = ?1", name)? {
      missing.push(name.clone());
    }
  }
  if !missing.is_empty() {
    return Ok(missing);
  }

  tx.execute(
    "DELETE FROM assignments WHERE user_id = ?1",
    rusqlite::params![user_id],
  )?;
  let mut stmt = tx.prepare(
    "INSERT INTO assignments (user_id, shift_name, position, is_default)
     VALUES (?1, ?2, ?3, ?4)",
  )?;
  for (position, (name, is_default)) in entries.iter().enumerate() {
    stmt.execute(rusqlite::params![user_id, name, position as i64, is_default])?;
  }
  Ok(missing)
}

fn assignment_rows(set: &AssignmentSet) -> Vec<(String, bool)> {
  set.iter().map(|a| (a.shift_name.clone(), a.is_default)).collect()
}

fn assignment_set(rows: Vec<(String, bool)>) -> AssignmentSet {
  AssignmentSet::from_entries(
    rows
      .into_iter()
      .map(|(name, is_default)| ShiftAssignment::new(name, is_default)),
  )
}

// ─── Transaction outcomes ────────────────────────────────────────────────────

/// Business outcomes decided inside a transaction, turned into errors once
/// back on the async side.
enum Outcome<T> {
  Done(T),
  UnknownShift(Vec<String>),
  DuplicateShift,
  UnknownUser,
  DuplicateUser,
  ShiftInUse { attendance: u64, users: u64 },
  RecordExists,
  /// A rule checked against the stored state failed.
  Rejected(CoreError),
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A rollcall store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fetch_attendance_by_id(&self, record_id: Uuid) -> Result<Option<AttendanceRecord>> {
    let id_str = encode_uuid(record_id);

    let raw: Option<RawAttendance> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE record_id = ?1"),
              rusqlite::params![id_str],
              RawAttendance::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAttendance::into_record).transpose()
  }
}

fn outcome<T>(o: Outcome<T>, shift: &str, user: &str) -> Result<T> {
  let err = match o {
    Outcome::Done(v) => return Ok(v),
    Outcome::UnknownShift(names) => CoreError::UnknownShift(names),
    Outcome::DuplicateShift => CoreError::DuplicateShiftName(shift.to_owned()),
    Outcome::UnknownUser => CoreError::UnknownUser(user.to_owned()),
    Outcome::DuplicateUser => CoreError::DuplicateUser(user.to_owned()),
    Outcome::ShiftInUse { attendance, users } => CoreError::ShiftInUse {
      name: shift.to_owned(),
      attendance,
      users,
    },
    Outcome::RecordExists => {
      CoreError::Conflict(format!("attendance for {user} on shift {shift} already exists"))
    }
    Outcome::Rejected(e) => e,
  };
  Err(err.into())
}

// ─── AttendanceStore impl ────────────────────────────────────────────────────

impl AttendanceStore for SqliteStore {
  type Error = Error;

  // ── Shifts ────────────────────────────────────────────────────────────────

  async fn create_shift(&self, shift: Shift) -> Result<Shift> {
    let name        = shift.name.clone();
    let start       = shift.start.to_string();
    let end         = shift.end.to_string();
    let tolerance   = shift.tolerance_minutes;
    let active      = shift.active;
    let description = shift.description.clone();
    let created_at  = encode_dt(shift.created_at);
    let updated_at  = encode_dt(shift.updated_at);

    let result = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO shifts (
             name, start_time, end_time, tolerance_minutes,
             active, description, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            name, start, end, tolerance, active, description, created_at,
            updated_at,
          ],
        );
        match inserted {
          Ok(_) => Ok(Outcome::Done(())),
          Err(e) if is_unique_violation(&e) => Ok(Outcome::DuplicateShift),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    outcome(result, &shift.name, "")?;
    Ok(shift)
  }

  async fn get_shift(&self, name: String) -> Result<Option<Shift>> {
    let raw: Option<RawShift> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE name = ?1"),
              rusqlite::params![name],
              RawShift::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawShift::into_shift).transpose()
  }

  async fn get_shifts(&self, names: Vec<String>) -> Result<Vec<Shift>> {
    if names.is_empty() {
      return Ok(Vec::new());
    }
    let names_json = serde_json::to_string(&names)?;

    let raws: Vec<RawShift> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SHIFT_COLUMNS} FROM shifts
           WHERE name IN (SELECT value FROM json_each(?1))"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![names_json], RawShift::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawShift::into_shift).collect()
  }

  async fn list_shifts(&self, active_only: bool) -> Result<Vec<Shift>> {
    let raws: Vec<RawShift> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SHIFT_COLUMNS} FROM shifts
           WHERE (?1 = 0 OR active = 1)
           ORDER BY start_time, name"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![active_only], RawShift::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawShift::into_shift).collect()
  }

  async fn update_shift(&self, shift: Shift) -> Result<Shift> {
    let name        = shift.name.clone();
    let start       = shift.start.to_string();
    let end         = shift.end.to_string();
    let tolerance   = shift.tolerance_minutes;
    let active      = shift.active;
    let description = shift.description.clone();
    let updated_at  = encode_dt(shift.updated_at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE shifts SET
             start_time = ?2, end_time = ?3, tolerance_minutes = ?4,
             active = ?5, description = ?6, updated_at = ?7
           WHERE name = ?1",
          rusqlite::params![name, start, end, tolerance, active, description, updated_at],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(CoreError::UnknownShift(vec![shift.name]).into());
    }
    Ok(shift)
  }

  async fn rename_shift(
    &self,
    old_name:   String,
    new_name:   String,
    updated_at: NaiveDateTime,
  ) -> Result<Shift> {
    let at_str = encode_dt(updated_at);
    let (old, new) = (old_name.clone(), new_name.clone());

    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if !row_exists(&tx, "SELECT 1 FROM shifts WHERE name = ?1", &old)? {
          return Ok(Outcome::UnknownShift(vec![old]));
        }
        if old != new {
          if row_exists(&tx, "SELECT 1 FROM shifts WHERE name = ?1", &new)? {
            return Ok(Outcome::DuplicateShift);
          }
          tx.execute(
            "UPDATE shifts SET name = ?2, updated_at = ?3 WHERE name = ?1",
            rusqlite::params![old, new, at_str],
          )?;
          tx.execute(
            "UPDATE assignments SET shift_name = ?2 WHERE shift_name = ?1",
            rusqlite::params![old, new],
          )?;
        }

        let raw = tx.query_row(
          &format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE name = ?1"),
          rusqlite::params![new],
          RawShift::from_row,
        )?;
        tx.commit()?;
        Ok(Outcome::Done(raw))
      })
      .await?;

    outcome(result, &new_name, "")?.into_shift()
  }

  async fn delete_shift(&self, name: String) -> Result<()> {
    let key = name.clone();

    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if !row_exists(&tx, "SELECT 1 FROM shifts WHERE name = ?1", &key)? {
          return Ok(Outcome::UnknownShift(vec![key]));
        }
        let attendance: i64 = tx.query_row(
          "SELECT COUNT(*) FROM attendance WHERE shift_name = ?1",
          rusqlite::params![key],
          |r| r.get(0),
        )?;
        let users: i64 = tx.query_row(
          "SELECT COUNT(DISTINCT user_id) FROM assignments WHERE shift_name = ?1",
          rusqlite::params![key],
          |r| r.get(0),
        )?;
        if attendance > 0 || users > 0 {
          return Ok(Outcome::ShiftInUse {
            attendance: attendance as u64,
            users:      users as u64,
          });
        }

        tx.execute("DELETE FROM shifts WHERE name = ?1", rusqlite::params![key])?;
        tx.commit()?;
        Ok(Outcome::Done(()))
      })
      .await?;

    outcome(result, &name, "")
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, user: User) -> Result<User> {
    let user_id    = user.user_id.clone();
    let name       = user.name.clone();
    let created_at = encode_dt(user.created_at);
    let entries    = assignment_rows(&user.assigned_shifts);

    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let inserted = tx.execute(
          "INSERT INTO users (user_id, name, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![user_id, name, created_at],
        );
        match inserted {
          Ok(_) => {}
          Err(e) if is_unique_violation(&e) => return Ok(Outcome::DuplicateUser),
          Err(e) => return Err(e.into()),
        }

        let missing = write_assignments(&tx, &user_id, &entries)?;
        if !missing.is_empty() {
          return Ok(Outcome::UnknownShift(missing));
        }
        tx.commit()?;
        Ok(Outcome::Done(()))
      })
      .await?;

    outcome(result, "", &user.user_id)?;
    Ok(user)
  }

  async fn get_user(&self, user_id: String) -> Result<Option<User>> {
    let raw = self
      .conn
      .call(move |conn| Ok(read_user(conn, &user_id)?))
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let heads: Vec<(String, String, String)> = {
          let mut stmt = conn.prepare(
            "SELECT user_id, name, created_at FROM users ORDER BY user_id",
          )?;
          stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut users = Vec::with_capacity(heads.len());
        for (user_id, name, created_at) in heads {
          let assignments = read_assignments(conn, &user_id)?;
          users.push(RawUser { user_id, name, created_at, assignments });
        }
        Ok(users)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn delete_user(&self, user_id: String) -> Result<u64> {
    let key = user_id.clone();

    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if !row_exists(&tx, "SELECT 1 FROM users WHERE user_id = ?1", &key)? {
          return Ok(Outcome::UnknownUser);
        }
        let removed = tx.execute(
          "DELETE FROM attendance WHERE user_id = ?1",
          rusqlite::params![key],
        )?;
        tx.execute("DELETE FROM assignments WHERE user_id = ?1", rusqlite::params![key])?;
        tx.execute("DELETE FROM users WHERE user_id = ?1", rusqlite::params![key])?;
        tx.commit()?;
        Ok(Outcome::Done(removed as u64))
      })
      .await?;

    outcome(result, "", &user_id)
  }

  async fn save_assignments(
    &self,
    user_id:     String,
    assignments: AssignmentSet,
  ) -> Result<()> {
    let key     = user_id.clone();
    let entries = assignment_rows(&assignments);

    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if !row_exists(&tx, "SELECT 1 FROM users WHERE user_id = ?1", &key)? {
          return Ok(Outcome::UnknownUser);
        }
        let missing = write_assignments(&tx, &key, &entries)?;
        if !missing.is_empty() {
          return Ok(Outcome::UnknownShift(missing));
        }
        tx.commit()?;
        Ok(Outcome::Done(()))
      })
      .await?;

    outcome(result, "", &user_id)
  }

  async fn update_assignments<F>(
    &self,
    user_id: String,
    edit:    F,
  ) -> Result<AssignmentSet>
  where
    F: FnOnce(&mut AssignmentSet) -> rollcall_core::Result<()> + Send + 'static,
  {
    let key = user_id.clone();

    let result = self
      .conn
      .call(move |conn| {
        // Take the write lock before reading so the edit sees the latest set.
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        if !row_exists(&tx, "SELECT 1 FROM users WHERE user_id = ?1", &key)? {
          return Ok(Outcome::UnknownUser);
        }
        let mut set = assignment_set(read_assignments(&tx, &key)?);
        if let Err(e) = edit(&mut set) {
          return Ok(Outcome::Rejected(e));
        }
        let missing = write_assignments(&tx, &key, &assignment_rows(&set))?;
        if !missing.is_empty() {
          return Ok(Outcome::UnknownShift(missing));
        }
        tx.commit()?;
        Ok(Outcome::Done(set))
      })
      .await?;

    outcome(result, "", &user_id)
  }

  // ── Attendance ────────────────────────────────────────────────────────────

  async fn find_attendance(&self, key: AttendanceKey) -> Result<Option<AttendanceRecord>> {
    let date_str = encode_date(key.date);

    let raw: Option<RawAttendance> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ATTENDANCE_COLUMNS} FROM attendance
                 WHERE user_id = ?1 AND shift_name = ?2 AND date = ?3"
              ),
              rusqlite::params![key.user_id, key.shift_name, date_str],
              RawAttendance::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAttendance::into_record).transpose()
  }

  async fn insert_attendance(&self, record: AttendanceRecord) -> Result<AttendanceRecord> {
    let check_in = record.check_in.as_ref();
    let check_out = record.check_out.as_ref();

    let id_str           = encode_uuid(record.record_id);
    let user_id          = record.user_id.clone();
    let shift_name       = record.shift_name.clone();
    let date_str         = encode_date(record.date);
    let check_in_time    = check_in.map(|c| c.time.to_string());
    let check_in_at      = check_in.map(|c| encode_dt(c.timestamp));
    let check_in_status  = check_in.map(|c| encode_punch_status(c.status));
    let check_out_time   = check_out.map(|c| c.time.to_string());
    let check_out_at     = check_out.map(|c| encode_dt(c.timestamp));
    let check_out_status = check_out.map(|c| encode_punch_status(c.status));
    let minutes_early    = check_out.map_or(0, |c| c.minutes_early);
    let work_duration    = record.work_duration.clone();
    let status           = encode_attendance_status(record.status);
    let note             = record.note.clone();
    let created_at       = encode_dt(record.created_at);
    let updated_at       = encode_dt(record.updated_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO attendance (
             record_id, user_id, shift_name, date,
             check_in_time, check_in_at, check_in_status,
             check_out_time, check_out_at, check_out_status, minutes_early,
             work_duration, status, note, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
          rusqlite::params![
            id_str,
            user_id,
            shift_name,
            date_str,
            check_in_time,
            check_in_at,
            check_in_status,
            check_out_time,
            check_out_at,
            check_out_status,
            minutes_early,
            work_duration,
            status,
            note,
            created_at,
            updated_at,
          ],
        );
        match result {
          Ok(_) => Ok(Outcome::Done(())),
          Err(e) if is_unique_violation(&e) => Ok(Outcome::RecordExists),
          Err(e) if is_foreign_key_violation(&e) => Ok(Outcome::UnknownUser),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    outcome(inserted, &record.shift_name, &record.user_id)?;
    Ok(record)
  }

  async fn complete_attendance(&self, record: AttendanceRecord) -> Result<AttendanceRecord> {
    let Some(check_out) = record.check_out.as_ref() else {
      return Err(
        CoreError::Conflict(format!("record {} carries no check-out", record.record_id))
          .into(),
      );
    };

    let id_str        = encode_uuid(record.record_id);
    let time          = check_out.time.to_string();
    let at            = encode_dt(check_out.timestamp);
    let punch_status  = encode_punch_status(check_out.status);
    let minutes_early = check_out.minutes_early;
    let work_duration = record.work_duration.clone();
    let status        = encode_attendance_status(record.status);
    let updated_at    = encode_dt(record.updated_at);

    // Compare-and-swap: only an open record accepts a check-out.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE attendance SET
             check_out_time = ?2, check_out_at = ?3, check_out_status = ?4,
             minutes_early = ?5, work_duration = ?6, status = ?7,
             updated_at = ?8
           WHERE record_id = ?1 AND check_out_time IS NULL",
          rusqlite::params![
            id_str,
            time,
            at,
            punch_status,
            minutes_early,
            work_duration,
            status,
            updated_at,
          ],
        )?)
      })
      .await?;

    if changed == 1 {
      return Ok(record);
    }

    match self.fetch_attendance_by_id(record.record_id).await? {
      Some(current) => Err(
        CoreError::AlreadyComplete {
          user_id: current.user_id,
          shift:   current.shift_name,
          date:    current.date,
        }
        .into(),
      ),
      None => Err(
        CoreError::Conflict(format!("record {} no longer exists", record.record_id))
          .into(),
      ),
    }
  }

  async fn list_attendance(&self, query: AttendanceQuery) -> Result<Vec<AttendanceRecord>> {
    let from_str   = query.from.map(encode_date);
    let to_str     = query.to.map(encode_date);
    let limit_val  = query.limit.map_or(-1, |l| l as i64);
    let offset_val = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawAttendance> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ATTENDANCE_COLUMNS} FROM attendance
           WHERE (?1 IS NULL OR user_id = ?1)
             AND (?2 IS NULL OR shift_name = ?2)
             AND (?3 IS NULL OR date >= ?3)
             AND (?4 IS NULL OR date <= ?4)
           ORDER BY date DESC, created_at DESC
           LIMIT ?5 OFFSET ?6"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              query.user_id,
              query.shift_name,
              from_str,
              to_str,
              limit_val,
              offset_val,
            ],
            RawAttendance::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAttendance::into_record).collect()
  }
}
