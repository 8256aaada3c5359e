//! Picks the shift a user is working at a given time of day.

use crate::{assignment::AssignmentSet, shift::Shift, time::ClockTime};

/// Resolve the active shift for `assignments` at `now`.
///
/// `shifts` is the live shift data for (at least) every assigned name.
///
/// 1. An active default shift wins outright, even if `now` is outside its
///    window.
/// 2. Otherwise the first active assigned shift, in assignment order, whose
///    span contains `now`.
pub fn resolve<'a>(
  assignments: &AssignmentSet,
  shifts: &'a [Shift],
  now: ClockTime,
) -> Option<&'a Shift> {
  let lookup = |name: &str| shifts.iter().find(|s| s.name == name && s.active);

  if let Some(default) = assignments.default_shift()
    && let Some(shift) = lookup(&default.shift_name)
  {
    return Some(shift);
  }

  assignments
    .shift_names()
    .filter_map(lookup)
    .find(|shift| shift.is_within_shift_time(now))
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::{
    assignment::ShiftAssignment,
    shift::{NewShift, ShiftUpdate},
  };

  fn shift(name: &str, start: &str, end: &str) -> Shift {
    let epoch = NaiveDate::from_ymd_opt(2024, 1, 1)
      .unwrap()
      .and_hms_opt(0, 0, 0)
      .unwrap();
    Shift::new(NewShift::new(name, start, end), 15, epoch).unwrap()
  }

  fn t(s: &str) -> ClockTime { s.parse().unwrap() }

  fn catalogue() -> Vec<Shift> {
    vec![
      shift("Morning", "09:00", "17:00"),
      shift("Evening", "17:00", "22:00"),
      shift("Night", "22:00", "06:00"),
    ]
  }

  #[test]
  fn default_shift_wins_outside_its_window() {
    let shifts = catalogue();
    let set = AssignmentSet::from_entries([
      ShiftAssignment::new("Night", false),
      ShiftAssignment::new("Morning", true),
    ]);
    let got = resolve(&set, &shifts, t("03:00")).unwrap();
    assert_eq!(got.name, "Morning");
  }

  #[test]
  fn inactive_default_falls_back_to_time_matching() {
    let mut shifts = catalogue();
    let epoch = shifts[0].created_at;
    shifts[0]
      .apply(ShiftUpdate { active: Some(false), ..Default::default() }, epoch)
      .unwrap();

    let set = AssignmentSet::from_entries([
      ShiftAssignment::new("Morning", true),
      ShiftAssignment::new("Night", false),
    ]);
    assert_eq!(resolve(&set, &shifts, t("23:00")).unwrap().name, "Night");
    assert!(resolve(&set, &shifts, t("12:00")).is_none());
  }

  #[test]
  fn first_matching_assignment_wins() {
    let shifts = catalogue();
    // 17:05 is inside both Morning (end + tolerance) and Evening.
    let set = AssignmentSet::from_entries([
      ShiftAssignment::new("Evening", false),
      ShiftAssignment::new("Morning", false),
    ]);
    assert_eq!(resolve(&set, &shifts, t("17:05")).unwrap().name, "Evening");

    let set = AssignmentSet::from_entries([
      ShiftAssignment::new("Morning", false),
      ShiftAssignment::new("Evening", false),
    ]);
    assert_eq!(resolve(&set, &shifts, t("17:05")).unwrap().name, "Morning");
  }

  #[test]
  fn nothing_matches() {
    let shifts = catalogue();
    let set = AssignmentSet::from_entries([ShiftAssignment::new("Morning", false)]);
    assert!(resolve(&set, &shifts, t("03:00")).is_none());
    assert!(resolve(&AssignmentSet::new(), &shifts, t("10:00")).is_none());
  }

  #[test]
  fn unknown_names_are_skipped() {
    let shifts = catalogue();
    let set = AssignmentSet::from_entries([
      ShiftAssignment::new("Ghost", true),
      ShiftAssignment::new("Night", false),
    ]);
    assert_eq!(resolve(&set, &shifts, t("01:00")).unwrap().name, "Night");
  }
}
