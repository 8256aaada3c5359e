//! Handlers for `/shifts` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/shifts` | Optional `?active_only=true` |
//! | `POST`   | `/shifts` | Body: `{"name","start","end"[,"tolerance_minutes","description"]}` |
//! | `GET`    | `/shifts/{name}` | 404 if not found |
//! | `PATCH`  | `/shifts/{name}` | Any of `start`, `end`, `tolerance_minutes`, `description`, `active` |
//! | `DELETE` | `/shifts/{name}` | 409 while attendance or assignments reference it |
//! | `POST`   | `/shifts/{name}/rename` | Body: `{"new_name":"…"}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use rollcall_core::{
  Tracker,
  shift::{NewShift, Shift, ShiftUpdate},
  store::AttendanceStore,
  time::Clock,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// A shift together with its derived fields.
#[derive(Debug, Serialize)]
pub struct ShiftView {
  #[serde(flatten)]
  pub shift:     Shift,
  pub overnight: bool,
  /// `H:mm`
  pub duration:  String,
}

impl From<Shift> for ShiftView {
  fn from(shift: Shift) -> Self {
    Self {
      overnight: shift.is_overnight(),
      duration: shift.duration_label(),
      shift,
    }
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub active_only: bool,
}

/// `GET /shifts[?active_only=true]`
pub async fn list<S, C>(
  State(tracker): State<Tracker<S, C>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ShiftView>>, ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  let shifts = tracker.list_shifts(params.active_only).await?;
  Ok(Json(shifts.into_iter().map(ShiftView::from).collect()))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /shifts`
pub async fn create<S, C>(
  State(tracker): State<Tracker<S, C>>,
  Json(body): Json<NewShift>,
) -> Result<(StatusCode, Json<ShiftView>), ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  let shift = tracker.create_shift(body).await?;
  Ok((StatusCode::CREATED, Json(shift.into())))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /shifts/{name}`
pub async fn get_one<S, C>(
  State(tracker): State<Tracker<S, C>>,
  Path(name): Path<String>,
) -> Result<Json<ShiftView>, ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  let shift = tracker
    .get_shift(&name)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("shift {name} not found")))?;
  Ok(Json(shift.into()))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /shifts/{name}`
pub async fn update<S, C>(
  State(tracker): State<Tracker<S, C>>,
  Path(name): Path<String>,
  Json(body): Json<ShiftUpdate>,
) -> Result<Json<ShiftView>, ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  let shift = tracker.update_shift(&name, body).await?;
  Ok(Json(shift.into()))
}

// ─── Rename ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RenameBody {
  pub new_name: String,
}

/// `POST /shifts/{name}/rename`, body: `{"new_name":"Morning"}`
pub async fn rename<S, C>(
  State(tracker): State<Tracker<S, C>>,
  Path(name): Path<String>,
  Json(body): Json<RenameBody>,
) -> Result<Json<ShiftView>, ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  let shift = tracker.rename_shift(&name, &body.new_name).await?;
  Ok(Json(shift.into()))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /shifts/{name}`
pub async fn delete_one<S, C>(
  State(tracker): State<Tracker<S, C>>,
  Path(name): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  tracker.delete_shift(&name).await?;
  Ok(StatusCode::NO_CONTENT)
}
