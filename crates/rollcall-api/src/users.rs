//! Handlers for `/users` endpoints and their shift assignments.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/users` | |
//! | `POST`   | `/users` | Body: `{"user_id","name"}` |
//! | `GET`    | `/users/{id}` | 404 if not found |
//! | `DELETE` | `/users/{id}` | Also removes the user's attendance history |
//! | `GET`    | `/users/{id}/current-shift` | `null` when no shift applies now |
//! | `GET`    | `/users/{id}/shifts` | The assignment set, in order |
//! | `PUT`    | `/users/{id}/shifts` | Body: `[{"shift_name","is_default"}, …]` |
//! | `POST`   | `/users/{id}/shifts` | Body: `{"shift_name"[,"is_default"]}` |
//! | `DELETE` | `/users/{id}/shifts/{name}` | |
//! | `POST`   | `/users/{id}/shifts/{name}/default` | |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use rollcall_core::{
  Tracker,
  assignment::{AssignmentSet, NewUser, ShiftAssignment, User},
  store::AttendanceStore,
  time::Clock,
};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, shifts::ShiftView};

// ─── Directory ────────────────────────────────────────────────────────────────

/// `GET /users`
pub async fn list<S, C>(
  State(tracker): State<Tracker<S, C>>,
) -> Result<Json<Vec<User>>, ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  Ok(Json(tracker.list_users().await?))
}

/// `POST /users`, body: `{"user_id":"alice","name":"Alice"}`
pub async fn create<S, C>(
  State(tracker): State<Tracker<S, C>>,
  Json(body): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  let user = tracker.add_user(body).await?;
  Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /users/{id}`
pub async fn get_one<S, C>(
  State(tracker): State<Tracker<S, C>>,
  Path(id): Path<String>,
) -> Result<Json<User>, ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  let user = tracker
    .get_user(&id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
  Ok(Json(user))
}

#[derive(Debug, Serialize)]
pub struct DeletedUser {
  pub user_id:            String,
  pub attendance_removed: u64,
}

/// `DELETE /users/{id}`
pub async fn delete_one<S, C>(
  State(tracker): State<Tracker<S, C>>,
  Path(id): Path<String>,
) -> Result<Json<DeletedUser>, ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  let attendance_removed = tracker.delete_user(&id).await?;
  Ok(Json(DeletedUser { user_id: id, attendance_removed }))
}

/// `GET /users/{id}/current-shift`
pub async fn current_shift<S, C>(
  State(tracker): State<Tracker<S, C>>,
  Path(id): Path<String>,
) -> Result<Json<Option<ShiftView>>, ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  let shift = tracker.current_shift(&id).await?;
  Ok(Json(shift.map(ShiftView::from)))
}

// ─── Assignments ──────────────────────────────────────────────────────────────

/// `GET /users/{id}/shifts`
pub async fn assignments<S, C>(
  State(tracker): State<Tracker<S, C>>,
  Path(id): Path<String>,
) -> Result<Json<AssignmentSet>, ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  let user = tracker
    .get_user(&id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
  Ok(Json(user.assigned_shifts))
}

/// `PUT /users/{id}/shifts`: replaces the whole set.
pub async fn replace_assignments<S, C>(
  State(tracker): State<Tracker<S, C>>,
  Path(id): Path<String>,
  Json(body): Json<Vec<ShiftAssignment>>,
) -> Result<Json<AssignmentSet>, ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  Ok(Json(tracker.replace_assignments(&id, body).await?))
}

#[derive(Debug, Deserialize)]
pub struct AssignBody {
  pub shift_name: String,
  #[serde(default)]
  pub is_default: bool,
}

/// `POST /users/{id}/shifts`, body: `{"shift_name":"Day","is_default":true}`
pub async fn assign<S, C>(
  State(tracker): State<Tracker<S, C>>,
  Path(id): Path<String>,
  Json(body): Json<AssignBody>,
) -> Result<(StatusCode, Json<AssignmentSet>), ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  let set = tracker
    .assign_shift(&id, &body.shift_name, body.is_default)
    .await?;
  Ok((StatusCode::CREATED, Json(set)))
}

/// `DELETE /users/{id}/shifts/{name}`
pub async fn unassign<S, C>(
  State(tracker): State<Tracker<S, C>>,
  Path((id, name)): Path<(String, String)>,
) -> Result<Json<AssignmentSet>, ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  Ok(Json(tracker.unassign_shift(&id, &name).await?))
}

/// `POST /users/{id}/shifts/{name}/default`
pub async fn set_default<S, C>(
  State(tracker): State<Tracker<S, C>>,
  Path((id, name)): Path<(String, String)>,
) -> Result<Json<AssignmentSet>, ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  Ok(Json(tracker.set_default_shift(&id, &name).await?))
}
