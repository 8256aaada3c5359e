//! Handlers for `/attendance` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/attendance` | Body: `{"user_id":"…"}`; 201 on check-in, 200 on check-out |
//! | `GET`  | `/attendance` | Optional `?user_id=&shift_name=&from=&to=&limit=&offset=` |
//! | `GET`  | `/attendance/status` | `?user_id=&shift_name=[&date=YYYY-MM-DD]` |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
};
use chrono::NaiveDate;
use rollcall_core::{
  Tracker,
  attendance::{AttendanceRecord, Punch},
  store::{AttendanceQuery, AttendanceStore},
  time::Clock,
  tracker::AttendanceSnapshot,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Page size when the request does not give one.
pub const DEFAULT_LIMIT: usize = 100;

// ─── Mark ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MarkBody {
  pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct PunchResponse {
  #[serde(flatten)]
  pub punch:   Punch,
  pub message: String,
}

/// `POST /attendance`, body: `{"user_id":"alice"}`
pub async fn mark<S, C>(
  State(tracker): State<Tracker<S, C>>,
  Json(body): Json<MarkBody>,
) -> Result<(StatusCode, Json<PunchResponse>), ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  let punch = tracker.mark_attendance(&body.user_id).await?;
  let status = match punch {
    Punch::CheckedIn(_) => StatusCode::CREATED,
    Punch::CheckedOut(_) => StatusCode::OK,
  };
  let message = punch.message();
  Ok((status, Json(PunchResponse { punch, message })))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub user_id:    Option<String>,
  pub shift_name: Option<String>,
  pub from:       Option<NaiveDate>,
  pub to:         Option<NaiveDate>,
  pub limit:      Option<usize>,
  pub offset:     Option<usize>,
}

/// `GET /attendance[?user_id=…&shift_name=…&from=…&to=…&limit=…&offset=…]`
pub async fn list<S, C>(
  State(tracker): State<Tracker<S, C>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  let query = AttendanceQuery {
    user_id:    params.user_id,
    shift_name: params.shift_name,
    from:       params.from,
    to:         params.to,
    limit:      Some(params.limit.unwrap_or(DEFAULT_LIMIT)),
    offset:     params.offset,
  };
  Ok(Json(tracker.list_attendance(query).await?))
}

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusParams {
  pub user_id:    String,
  pub shift_name: String,
  pub date:       Option<NaiveDate>,
}

/// `GET /attendance/status?user_id=…&shift_name=…[&date=…]`
pub async fn status<S, C>(
  State(tracker): State<Tracker<S, C>>,
  Query(params): Query<StatusParams>,
) -> Result<Json<AttendanceSnapshot>, ApiError>
where
  S: AttendanceStore,
  C: Clock,
{
  let snapshot = tracker
    .current_status(&params.user_id, &params.shift_name, params.date)
    .await?;
  Ok(Json(snapshot))
}
