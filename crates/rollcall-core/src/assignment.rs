//! Users and their shift assignments.
//!
//! An [`AssignmentSet`] is an ordered list of shift names, unique by name,
//! with at most one entry flagged as the default. Every mutator preserves
//! that invariant; existence of the referenced shifts is checked by the
//! caller, which owns the shift catalogue.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Assignment ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftAssignment {
  pub shift_name: String,
  #[serde(default)]
  pub is_default: bool,
}

impl ShiftAssignment {
  pub fn new(shift_name: impl Into<String>, is_default: bool) -> Self {
    Self { shift_name: shift_name.into(), is_default }
  }
}

// ─── AssignmentSet ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignmentSet(Vec<ShiftAssignment>);

impl AssignmentSet {
  pub fn new() -> Self { Self::default() }

  /// Build a set from a list of entries.
  ///
  /// Duplicate names collapse to their first occurrence. When several entries
  /// claim to be the default, the last one wins.
  pub fn from_entries(entries: impl IntoIterator<Item = ShiftAssignment>) -> Self {
    let mut set = Self::new();
    for entry in entries {
      if set.contains(&entry.shift_name) {
        continue;
      }
      if entry.is_default {
        set.clear_default();
      }
      set.0.push(entry);
    }
    set
  }

  pub fn entries(&self) -> &[ShiftAssignment] { &self.0 }

  pub fn iter(&self) -> impl Iterator<Item = &ShiftAssignment> { self.0.iter() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn contains(&self, shift_name: &str) -> bool {
    self.0.iter().any(|a| a.shift_name == shift_name)
  }

  pub fn default_shift(&self) -> Option<&ShiftAssignment> {
    self.0.iter().find(|a| a.is_default)
  }

  /// Shift names in assignment order.
  pub fn shift_names(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(|a| a.shift_name.as_str())
  }

  /// Append `shift_name`, taking over the default flag if `is_default`.
  pub fn add(
    &mut self,
    user_id: &str,
    shift_name: &str,
    is_default: bool,
  ) -> Result<()> {
    if self.contains(shift_name) {
      return Err(Error::AlreadyAssigned {
        user_id: user_id.to_owned(),
        shift:   shift_name.to_owned(),
      });
    }
    if is_default {
      self.clear_default();
    }
    self.0.push(ShiftAssignment::new(shift_name, is_default));
    Ok(())
  }

  pub fn remove(&mut self, user_id: &str, shift_name: &str) -> Result<()> {
    let index = self.position(user_id, shift_name)?;
    self.0.remove(index);
    Ok(())
  }

  /// Make `shift_name` the only default entry.
  pub fn set_default(&mut self, user_id: &str, shift_name: &str) -> Result<()> {
    let index = self.position(user_id, shift_name)?;
    self.clear_default();
    self.0[index].is_default = true;
    Ok(())
  }

  /// Replace an entry's shift name in place, keeping order and default flag.
  /// Returns whether anything changed.
  pub fn rename(&mut self, old_name: &str, new_name: &str) -> bool {
    let mut changed = false;
    for entry in self.0.iter_mut().filter(|a| a.shift_name == old_name) {
      entry.shift_name = new_name.to_owned();
      changed = true;
    }
    changed
  }

  fn position(&self, user_id: &str, shift_name: &str) -> Result<usize> {
    self
      .0
      .iter()
      .position(|a| a.shift_name == shift_name)
      .ok_or_else(|| Error::NotAssigned {
        user_id: user_id.to_owned(),
        shift:   shift_name.to_owned(),
      })
  }

  fn clear_default(&mut self) {
    for entry in &mut self.0 {
      entry.is_default = false;
    }
  }
}

impl<'a> IntoIterator for &'a AssignmentSet {
  type Item = &'a ShiftAssignment;
  type IntoIter = std::slice::Iter<'a, ShiftAssignment>;

  fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

// ─── User ────────────────────────────────────────────────────────────────────

/// A directory entry. Identity and credentials live elsewhere; the core only
/// cares about which shifts a user works.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:         String,
  pub name:            String,
  pub assigned_shifts: AssignmentSet,
  pub created_at:      NaiveDateTime,
}

/// Input to [`crate::store::AttendanceStore::add_user`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
  pub user_id: String,
  pub name:    String,
}
